use std::path::PathBuf;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use service::group::{with_store_opts, MembershipLookup, StoreOptions, WriteMode};
use tracing::{error, info};
use uuid::Uuid;

const USAGE: &str = "usage: groupdb <list | members GROUP | check USER GROUP | add USER GROUP | remove USER GROUP>";

enum Command {
    List,
    Members { group: String },
    Check { user: String, group: String },
    Add { user: String, group: String },
    Remove { user: String, group: String },
}

impl Command {
    fn from_args(args: &[String]) -> anyhow::Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let cmd = match args.as_slice() {
            ["list"] => Command::List,
            ["members", group] => Command::Members { group: group.to_string() },
            ["check", user, group] => Command::Check { user: user.to_string(), group: group.to_string() },
            ["add", user, group] => Command::Add { user: user.to_string(), group: group.to_string() },
            ["remove", user, group] => Command::Remove { user: user.to_string(), group: group.to_string() },
            _ => return Err(anyhow!(USAGE)),
        };
        Ok(cmd)
    }

    fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Members { .. } => "members",
            Command::Check { .. } => "check",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
        }
    }
}

/// Runs one command; `Ok(false)` means a negative `check`.
fn run(cmd: &Command, path: PathBuf, options: StoreOptions) -> anyhow::Result<bool> {
    with_store_opts(path, options, |store| -> anyhow::Result<bool> {
        match cmd {
            Command::List => {
                for group in store.list_groups() {
                    println!("{group}");
                }
                Ok(true)
            }
            Command::Members { group } => {
                let members = store.members(group).ok_or_else(|| anyhow!("group not found: {group}"))?;
                for user in members {
                    println!("{user}");
                }
                Ok(true)
            }
            Command::Check { user, group } => {
                let lookup: &dyn MembershipLookup = &*store;
                Ok(lookup.is_member(user, group))
            }
            Command::Add { user, group } => {
                store.add_member(user, group)?;
                Ok(true)
            }
            Command::Remove { user, group } => {
                store.remove_member(user, group)?;
                Ok(true)
            }
        }
    })
}

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / CONFIG_PATH / GROUP_DB_PATH 生效
    dotenv().ok();

    let cfg = match configs::AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(&cfg.logging.format);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cmd = match Command::from_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let run_id = Uuid::new_v4();
    let path = PathBuf::from(&cfg.group_db.path);
    let options = StoreOptions {
        write_mode: if cfg.group_db.atomic_write { WriteMode::Atomic } else { WriteMode::InPlace },
    };
    info!(event = "start", %run_id, command = cmd.name(), path = %path.display(), "groupdb started");

    let result = common::env::ensure_group_file(&path, cfg.group_db.create_if_missing)
        .and_then(|()| run(&cmd, path.clone(), options))
        .with_context(|| format!("{} on {}", cmd.name(), path.display()));

    match result {
        Ok(ok) => {
            info!(event = "finish", %run_id, command = cmd.name(), ok, "groupdb finished");
            if ok { std::process::ExitCode::SUCCESS } else { std::process::ExitCode::FAILURE }
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(event = "failed", %run_id, command = cmd.name(), error = %message, "groupdb failed");
            eprintln!("error: {message}");
            std::process::ExitCode::FAILURE
        }
    }
}
