//! Service layer for flat-file group membership databases.
//! - `group` holds the database model and the open/close session.
//! - `storage` holds the on-disk line format and file writers.
//! - `errors` provides the tagged error type shared by both.

pub mod errors;
pub mod group;
pub mod storage;

pub use errors::GroupError;
pub use group::{with_store, GroupDatabase, GroupStore, MembershipLookup};
