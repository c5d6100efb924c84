use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

use crate::errors::GroupError;
use crate::group::database::GroupDatabase;
use crate::storage::group_file;

/// How `close` replaces the file when the working copy changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Temp file + rename; readers see either the old or the new file.
    #[default]
    Atomic,
    /// Truncate and rewrite the file directly.
    InPlace,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub write_mode: WriteMode,
}

/// Open session on a group database file.
///
/// Holding a `GroupStore` means the file has been loaded. Queries and
/// mutations work on a private working copy; the file is only rewritten when
/// the session ends and the working copy differs from what was loaded.
/// The session ends with [`close`](Self::close), [`discard`](Self::discard),
/// or, failing both, when the handle is dropped (which flushes like `close`
/// but can only log a write failure).
#[derive(Debug)]
pub struct GroupStore {
    path: PathBuf,
    loaded: GroupDatabase,
    working: GroupDatabase,
    options: StoreOptions,
    finished: bool,
}

impl GroupStore {
    /// Load the group file at `path` with default options.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, GroupError> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with<P: Into<PathBuf>>(path: P, options: StoreOptions) -> Result<Self, GroupError> {
        let path = path.into();
        let loaded = group_file::read(&path)?;
        info!(path = %path.display(), groups = loaded.len(), "group database loaded");
        let working = loaded.clone();
        Ok(Self { path, loaded, working, options, finished: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Group names in file order.
    pub fn list_groups(&self) -> Vec<String> {
        self.working.group_names().map(str::to_string).collect()
    }

    pub fn group_exists(&self, group: &str) -> bool {
        self.working.contains_group(group)
    }

    /// Returns false for a group that does not exist.
    pub fn is_member(&self, user: &str, group: &str) -> bool {
        self.working.is_member(user, group)
    }

    pub fn members(&self, group: &str) -> Option<&[String]> {
        self.working.members(group).map(|m| m.as_slice())
    }

    /// Current working copy.
    pub fn working(&self) -> &GroupDatabase {
        &self.working
    }

    pub fn is_modified(&self) -> bool {
        self.working != self.loaded
    }

    /// Add `user` to `group`, creating the group if needed.
    pub fn add_member(&mut self, user: &str, group: &str) -> Result<(), GroupError> {
        self.working.add_member(user, group)?;
        debug!(user, group, "member added");
        Ok(())
    }

    /// Remove `user` from `group`. The group is kept even when it becomes empty.
    pub fn remove_member(&mut self, user: &str, group: &str) -> Result<(), GroupError> {
        self.working.remove_member(user, group)?;
        debug!(user, group, "member removed");
        Ok(())
    }

    /// End the session, writing the file if the working copy changed.
    ///
    /// Returns whether the file was rewritten.
    pub fn close(mut self) -> Result<bool, GroupError> {
        self.finished = true;
        self.flush()
    }

    /// End the session without writing anything.
    pub fn discard(mut self) {
        self.finished = true;
        if self.is_modified() {
            info!(path = %self.path.display(), "group database changes discarded");
        }
    }

    fn flush(&mut self) -> Result<bool, GroupError> {
        if !self.is_modified() {
            debug!(path = %self.path.display(), "group database unchanged; not writing");
            return Ok(false);
        }
        let contents = group_file::render(&self.working);
        match self.options.write_mode {
            WriteMode::Atomic => group_file::write_atomic(&self.path, &contents)?,
            WriteMode::InPlace => group_file::write_in_place(&self.path, &contents)?,
        }
        info!(path = %self.path.display(), groups = self.working.len(), "group database written");
        self.loaded = self.working.clone();
        Ok(true)
    }
}

impl Drop for GroupStore {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.flush() {
            error!(path = %self.path.display(), error = %e, "failed to persist group database on drop");
        }
    }
}

/// Open `path`, run `f`, and always close the store afterwards.
///
/// Changes applied before `f` fails are still persisted. When closing fails
/// its error is returned even if `f` failed too, and `f`'s error is logged.
pub fn with_store<P, T, E, F>(path: P, f: F) -> Result<T, E>
where
    P: Into<PathBuf>,
    E: From<GroupError> + Display,
    F: FnOnce(&mut GroupStore) -> Result<T, E>,
{
    with_store_opts(path, StoreOptions::default(), f)
}

pub fn with_store_opts<P, T, E, F>(path: P, options: StoreOptions, f: F) -> Result<T, E>
where
    P: Into<PathBuf>,
    E: From<GroupError> + Display,
    F: FnOnce(&mut GroupStore) -> Result<T, E>,
{
    let mut store = GroupStore::open_with(path, options)?;
    let result = f(&mut store);
    match (result, store.close()) {
        (result, Ok(_)) => result,
        (Ok(_), Err(close_err)) => Err(close_err.into()),
        (Err(e), Err(close_err)) => {
            warn!(error = %e, "group store callback failed before close error");
            Err(close_err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn group_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("group_store_{}", Uuid::new_v4()));
        fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let path = std::env::temp_dir().join(format!("absent_{}", Uuid::new_v4()));
        assert!(matches!(GroupStore::open(&path), Err(GroupError::NotFound { .. })));
    }

    #[test]
    fn add_then_close_appends_member() -> Result<(), anyhow::Error> {
        let path = group_file("admins: alice bob\n");
        let mut store = GroupStore::open(&path)?;
        store.add_member("carol", "admins")?;
        assert_eq!(store.list_groups(), vec!["admins".to_string()]);
        assert!(store.is_member("carol", "admins"));
        assert!(store.close()?);
        assert_eq!(fs::read_to_string(&path)?, "admins: alice bob carol\n");
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn unmodified_close_does_not_write() -> Result<(), anyhow::Error> {
        let path = group_file("ops: alice \\\n    bob\n");
        let store = GroupStore::open(&path)?;
        assert_eq!(store.members("ops"), Some(&["alice".to_string(), "bob".to_string()][..]));
        assert!(!store.close()?);
        // continuation is left as-is because nothing was rewritten
        assert_eq!(fs::read_to_string(&path)?, "ops: alice \\\n    bob\n");
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn add_then_remove_is_not_a_change() -> Result<(), anyhow::Error> {
        let path = group_file("admins: alice bob\n");
        let mut store = GroupStore::open(&path)?;
        store.add_member("carol", "admins")?;
        assert!(store.is_modified());
        store.remove_member("carol", "admins")?;
        assert!(!store.is_modified());
        assert!(!store.close()?);
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn discard_leaves_file_alone() -> Result<(), anyhow::Error> {
        let path = group_file("admins: alice\n");
        let mut store = GroupStore::open(&path)?;
        store.add_member("bob", "admins")?;
        store.discard();
        assert_eq!(fs::read_to_string(&path)?, "admins: alice\n");
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn drop_flushes_changes() -> Result<(), anyhow::Error> {
        let path = group_file("admins: alice\n");
        {
            let mut store = GroupStore::open(&path)?;
            store.add_member("bob", "staff")?;
        }
        assert_eq!(fs::read_to_string(&path)?, "admins: alice\nstaff: bob\n");
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn in_place_mode_rewrites_file() -> Result<(), anyhow::Error> {
        let path = group_file("solo: alice\n");
        let mut store = GroupStore::open_with(&path, StoreOptions { write_mode: WriteMode::InPlace })?;
        store.remove_member("alice", "solo")?;
        assert!(store.group_exists("solo"));
        assert!(store.close()?);
        assert_eq!(fs::read_to_string(&path)?, "solo: \n");
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn with_store_persists_changes_made_before_an_error() -> Result<(), anyhow::Error> {
        let path = group_file("admins: alice bob\n");
        let result: Result<(), GroupError> = with_store(&path, |store| {
            store.add_member("carol", "admins")?;
            store.add_member("alice", "admins")?;
            Ok(())
        });
        assert!(matches!(result, Err(GroupError::DuplicateMembership { .. })));
        assert_eq!(fs::read_to_string(&path)?, "admins: alice bob carol\n");
        let _ = fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn with_store_prefers_close_error() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("group_store_dir_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("groups");
        fs::write(&path, "admins: alice\n")?;

        let result: Result<(), GroupError> = with_store(&path, |store| {
            store.add_member("bob", "admins")?;
            // removing the directory makes the atomic rename fail on close
            fs::remove_dir_all(&dir).map_err(|e| GroupError::io(&dir, e))?;
            store.remove_member("dave", "admins")
        });
        assert!(matches!(result, Err(GroupError::NotFound { .. })));
        Ok(())
    }
}
