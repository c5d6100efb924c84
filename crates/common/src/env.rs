//! Environment/runtime helpers
//!
//! Sanity checks to ensure the group database file is in place at startup.

use std::{fs, path::Path};

use tracing::{info, warn};

/// Make sure the group file exists when `create` is set; warn when it is missing otherwise.
pub fn ensure_group_file(path: &Path, create: bool) -> anyhow::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if !create {
        warn!(path = %path.display(), "group database file not found");
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    }
    fs::write(path, "").map_err(|e| anyhow::anyhow!("cannot create {}: {e}", path.display()))?;
    info!(path = %path.display(), "created empty group database");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_file_and_parents() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("common_env_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("groups");

        ensure_group_file(&path, false)?;
        assert!(!path.exists());

        ensure_group_file(&path, true)?;
        assert_eq!(fs::read_to_string(&path)?, "");

        fs::write(&path, "admins: alice\n")?;
        ensure_group_file(&path, true)?;
        assert_eq!(fs::read_to_string(&path)?, "admins: alice\n");

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
