//! Shared startup plumbing for the group tools: logging setup and
//! environment checks.

pub mod env;
pub mod utils;
