use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub group_db: GroupDbConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupDbConfig {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_atomic_write")]
    pub atomic_write: bool,
    #[serde(default)]
    pub create_if_missing: bool,
}

impl Default for GroupDbConfig {
    fn default() -> Self {
        Self { path: String::new(), atomic_write: default_atomic_write(), create_if_missing: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_atomic_write() -> bool { true }
fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Like `load_and_validate`, but a missing config file falls back to defaults + env.
    pub fn load_or_default() -> Result<Self> {
        let path = config_path();
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // path may come from GROUP_DB_PATH when the TOML leaves it empty
        self.group_db.normalize_from_env();
        self.group_db.validate()?;
        self.logging.normalize()?;
        Ok(())
    }
}

impl GroupDbConfig {
    pub fn normalize_from_env(&mut self) {
        if self.path.trim().is_empty() {
            if let Ok(path) = std::env::var("GROUP_DB_PATH") {
                self.path = path;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(anyhow!("group_db.path is empty; set it in config.toml or via GROUP_DB_PATH"));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn normalize(&mut self) -> Result<()> {
        self.format = self.format.trim().to_ascii_lowercase();
        if self.format.is_empty() {
            self.format = default_log_format();
        }
        match self.format.as_str() {
            "compact" | "json" => Ok(()),
            other => Err(anyhow!("logging.format must be \"compact\" or \"json\", got {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() -> Result<()> {
        let mut cfg: AppConfig = toml::from_str(
            r#"
            [group_db]
            path = "/etc/auth/groups"
            atomic_write = false
            create_if_missing = true

            [logging]
            format = "JSON"
            "#,
        )?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.group_db.path, "/etc/auth/groups");
        assert!(!cfg.group_db.atomic_write);
        assert!(cfg.group_db.create_if_missing);
        assert_eq!(cfg.logging.format, "json");
        Ok(())
    }

    #[test]
    fn defaults_apply_to_missing_sections() -> Result<()> {
        let cfg: AppConfig = toml::from_str("[group_db]\npath = \"groups\"\n")?;
        assert!(cfg.group_db.atomic_write);
        assert!(!cfg.group_db.create_if_missing);
        assert_eq!(cfg.logging.format, "compact");
        Ok(())
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut cfg = AppConfig::default();
        cfg.group_db.path = "groups".into();
        cfg.logging.format = "xml".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn validate_requires_path() {
        let cfg = GroupDbConfig { path: "  ".into(), ..GroupDbConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
