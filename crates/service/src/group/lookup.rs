use crate::group::database::GroupDatabase;
use crate::group::store::GroupStore;

/// Read-only membership view consulted by the authorization layer.
/// Implementations can be an open file session or a detached snapshot.
pub trait MembershipLookup {
    fn group_exists(&self, group: &str) -> bool;
    fn is_member(&self, user: &str, group: &str) -> bool;
}

impl MembershipLookup for GroupDatabase {
    fn group_exists(&self, group: &str) -> bool { self.contains_group(group) }
    fn is_member(&self, user: &str, group: &str) -> bool { GroupDatabase::is_member(self, user, group) }
}

impl MembershipLookup for GroupStore {
    fn group_exists(&self, group: &str) -> bool { GroupStore::group_exists(self, group) }
    fn is_member(&self, user: &str, group: &str) -> bool { GroupStore::is_member(self, user, group) }
}
