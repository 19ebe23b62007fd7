//! Project flag repository.
//!
//! All flags live in one global slot of the key-value store. Reads degrade
//! to an empty map on absent or corrupt data; writes are read-modify-write
//! of the whole map without any concurrency token, so two writers racing on
//! different projects are last-write-wins.

pub mod repository;

pub use repository::{FlagRepository, KvFlagRepository};

/// Well-known slot name holding the encoded `ProjectFlags`.
pub const FLAGS_SLOT: &str = "project-flags";
