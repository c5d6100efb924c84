use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::warn;
use uuid::Uuid;

use crate::errors::GroupError;
use crate::group::database::{validate_group, validate_user, GroupDatabase};

const CONTINUATION: &str = "\\\n";
const CONTINUATION_CRLF: &str = "\\\r\n";
const SEPARATOR: &str = ": ";

/// Parse the contents of a group file.
///
/// Each logical line is `GROUP: user1 user2 ...`. Backslash-newline pairs are
/// joined first. Repeated members (and repeated group lines) are merged
/// silently so a hand-edited file never fails to load over a duplicate.
/// Names follow the same rules as `GroupDatabase::add_member`, so whatever
/// loads can be rendered back without changing meaning.
pub fn parse(content: &str) -> Result<GroupDatabase, GroupError> {
    let joined = content.replace(CONTINUATION_CRLF, "").replace(CONTINUATION, "");
    let mut db = GroupDatabase::new();

    for (idx, line) in joined.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (group, users) = match line.split_once(SEPARATOR) {
            Some(parts) => parts,
            // `name:` with the trailing space stripped by an editor
            None => match line.trim_end().strip_suffix(':') {
                Some(group) => (group, ""),
                None => return Err(malformed(idx, line)),
            },
        };
        validate_group(group).map_err(|_| malformed(idx, line))?;
        let users: Vec<&str> = users.split_whitespace().collect();
        if users.iter().any(|user| validate_user(user).is_err()) {
            return Err(malformed(idx, line));
        }
        let members = db.entry(group);
        for user in users {
            members.push_unique(user);
        }
    }
    Ok(db)
}

fn malformed(idx: usize, line: &str) -> GroupError {
    GroupError::Malformed { line: idx + 1, content: line.to_string() }
}

/// Render one line per group, members space-joined. No continuations are emitted.
pub fn render(db: &GroupDatabase) -> String {
    let mut out = String::new();
    for (group, members) in db.iter() {
        out.push_str(group);
        out.push_str(SEPARATOR);
        out.push_str(&members.as_slice().join(" "));
        out.push('\n');
    }
    out
}

pub fn read(path: &Path) -> Result<GroupDatabase, GroupError> {
    let content = fs::read_to_string(path).map_err(|e| GroupError::io(path, e))?;
    parse(&content)
}

/// Truncate and rewrite `path`. A crash mid-write leaves a partial file.
pub fn write_in_place(path: &Path, contents: &str) -> Result<(), GroupError> {
    fs::write(path, contents).map_err(|e| GroupError::io(path, e))
}

/// Write to a sibling temp file and rename it over `path`.
///
/// The target is either fully replaced or left untouched. The original file's
/// permissions are carried over to the replacement. A symlinked `path` is
/// resolved first so the link survives and its target is updated. An existing
/// target that cannot be opened for writing fails before anything is written.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), GroupError> {
    let target = resolve_target(path)?;
    if target.exists() {
        fs::OpenOptions::new().write(true).open(&target).map_err(|e| GroupError::io(&target, e))?;
    }
    let tmp = temp_path(&target);
    let result = write_temp(&target, &tmp, contents).and_then(|()| {
        fs::rename(&tmp, &target).map_err(|e| GroupError::io(&target, e))
    });
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!(tmp = %tmp.display(), error = %e, "failed to remove temp group file");
        }
    }
    result
}

/// Follow symlinks; a missing file is written at `path` as given.
fn resolve_target(path: &Path) -> Result<PathBuf, GroupError> {
    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(e) => Err(GroupError::io(path, e)),
    }
}

fn write_temp(path: &Path, tmp: &Path, contents: &str) -> Result<(), GroupError> {
    let mut file = fs::File::create(tmp).map_err(|e| GroupError::io(tmp, e))?;
    file.write_all(contents.as_bytes()).map_err(|e| GroupError::io(tmp, e))?;
    if let Ok(meta) = fs::metadata(path) {
        file.set_permissions(meta.permissions()).map_err(|e| GroupError::io(tmp, e))?;
    }
    file.sync_all().map_err(|e| GroupError::io(tmp, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "groups".into());
    let tmp_name = format!(".{}.{}.tmp", name, Uuid::new_v4().simple());
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(tmp_name),
        _ => PathBuf::from(tmp_name),
    }
}
