//! Group membership: the in-memory database, the file-backed session
//! around it, and the read-only lookup seam.

pub mod database;
pub mod lookup;
pub mod store;

pub use database::{GroupDatabase, Members};
pub use lookup::MembershipLookup;
pub use store::{with_store, with_store_opts, GroupStore, StoreOptions, WriteMode};
