use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while loading, querying, mutating or persisting a group database.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group database not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed group line {line}: {content:?}")]
    Malformed { line: usize, content: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("group not found: {group}")]
    GroupNotFound { group: String },
    #[error("user {user} already in group {group}")]
    DuplicateMembership { user: String, group: String },
    #[error("user {user} not in group {group}")]
    MembershipNotFound { user: String, group: String },
}

impl GroupError {
    /// Map an I/O failure on `path`, keeping "file is missing" as its own kind.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn group_not_found(group: &str) -> Self {
        Self::GroupNotFound { group: group.to_string() }
    }

    pub fn duplicate(user: &str, group: &str) -> Self {
        Self::DuplicateMembership { user: user.to_string(), group: group.to_string() }
    }

    pub fn not_a_member(user: &str, group: &str) -> Self {
        Self::MembershipNotFound { user: user.to_string(), group: group.to_string() }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            GroupError::NotFound { .. } => 1001,
            GroupError::Io { .. } => 1002,
            GroupError::Malformed { .. } => 1003,
            GroupError::Validation(_) => 2001,
            GroupError::GroupNotFound { .. } => 2002,
            GroupError::DuplicateMembership { .. } => 2003,
            GroupError::MembershipNotFound { .. } => 2004,
        }
    }

    /// Domain errors leave the working copy untouched and can be reported to an end user.
    pub fn is_domain(&self) -> bool {
        self.code() >= 2000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = GroupError::io("/tmp/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, GroupError::NotFound { .. }));
        assert_eq!(err.code(), 1001);
        assert!(!err.is_domain());

        let err = GroupError::io("/tmp/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, GroupError::Io { .. }));
    }

    #[test]
    fn domain_errors_are_recoverable() {
        assert!(GroupError::duplicate("alice", "admins").is_domain());
        assert!(GroupError::not_a_member("dave", "admins").is_domain());
        assert!(GroupError::group_not_found("guests").is_domain());
        assert_eq!(GroupError::duplicate("alice", "admins").to_string(), "user alice already in group admins");
    }
}
