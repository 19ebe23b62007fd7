//! Server-side half of the project flag subsystem.
//! - `storage`: the global key-value store holding the flag slot.
//! - `flags`: the repository that decodes, merges and re-encodes that slot.

pub mod errors;
pub mod storage;
pub mod flags;
