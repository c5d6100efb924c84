//! Storage helpers for service layer
//!
//! Contains the flat-file codec for group databases and the writers used
//! to persist them.

pub mod group_file;
