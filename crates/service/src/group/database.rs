use crate::errors::GroupError;

/// Ordered member list of one group. A user appears at most once.
///
/// Read-only outside the crate; membership changes go through
/// [`GroupDatabase::add_member`] and [`GroupDatabase::remove_member`].
///
/// ```compile_fail
/// let mut members = service::group::Members::default();
/// members.push_unique("alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members(Vec<String>);

impl Members {
    pub fn contains(&self, user: &str) -> bool {
        self.0.iter().any(|u| u == user)
    }

    /// Append `user` unless already present; returns whether it was appended.
    pub(crate) fn push_unique(&mut self, user: &str) -> bool {
        if self.contains(user) {
            return false;
        }
        self.0.push(user.to_string());
        true
    }

    /// Remove `user`, keeping the order of the others; returns whether it was present.
    pub(crate) fn remove(&mut self, user: &str) -> bool {
        match self.0.iter().position(|u| u == user) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// In-memory group database: group name -> ordered members.
///
/// Both the order of groups and the order of members inside a group are kept
/// as inserted, so rendering the database back to disk is stable. Equality is
/// structural and order-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDatabase {
    groups: Vec<(String, Members)>,
}

impl GroupDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group names in their current order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// `(group, members)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Members)> {
        self.groups.iter().map(|(name, members)| (name.as_str(), members))
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.members(group).is_some()
    }

    pub fn members(&self, group: &str) -> Option<&Members> {
        self.groups.iter().find(|(name, _)| name == group).map(|(_, m)| m)
    }

    /// False for a group that does not exist.
    pub fn is_member(&self, user: &str, group: &str) -> bool {
        self.members(group).is_some_and(|m| m.contains(user))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Members of `group`, creating the group at the end if missing.
    pub(crate) fn entry(&mut self, group: &str) -> &mut Members {
        let idx = match self.groups.iter().position(|(name, _)| name == group) {
            Some(idx) => idx,
            None => {
                self.groups.push((group.to_string(), Members::default()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx].1
    }

    fn members_mut(&mut self, group: &str) -> Option<&mut Members> {
        self.groups.iter_mut().find(|(name, _)| name == group).map(|(_, m)| m)
    }

    /// Add `user` to `group`, creating the group when needed.
    ///
    /// Unlike loading, this rejects a user who is already a member.
    pub fn add_member(&mut self, user: &str, group: &str) -> Result<(), GroupError> {
        validate_user(user)?;
        validate_group(group)?;
        if self.is_member(user, group) {
            return Err(GroupError::duplicate(user, group));
        }
        self.entry(group).push_unique(user);
        Ok(())
    }

    /// Remove `user` from `group`. An emptied group stays in the database.
    pub fn remove_member(&mut self, user: &str, group: &str) -> Result<(), GroupError> {
        let members = self.members_mut(group).ok_or_else(|| GroupError::group_not_found(group))?;
        if !members.remove(user) {
            return Err(GroupError::not_a_member(user, group));
        }
        Ok(())
    }
}

/// Group names must survive a render/parse cycle.
pub fn validate_group(group: &str) -> Result<(), GroupError> {
    if group.trim().is_empty() {
        return Err(GroupError::Validation("group name must not be empty".into()));
    }
    if group.contains(": ") || group.contains('\n') || group.contains('\r') {
        return Err(GroupError::Validation(format!(
            "group name {group:?} must not contain \": \" or line breaks"
        )));
    }
    Ok(())
}

pub fn validate_user(user: &str) -> Result<(), GroupError> {
    if user.is_empty() {
        return Err(GroupError::Validation("user name must not be empty".into()));
    }
    if user.chars().any(char::is_whitespace) {
        return Err(GroupError::Validation(format!("user name {user:?} must not contain whitespace")));
    }
    // a backslash at end of line reads back as a continuation
    if user.ends_with('\\') {
        return Err(GroupError::Validation(format!("user name {user:?} must not end with a backslash")));
    }
    Ok(())
}
