//! Client-side half of the project flag subsystem.
//! - `bridge`: the host bridge contract and its reqwest implementation.
//! - `flags`: optimistic flag state with point revert on failed writes.
//! - `projects`: upstream project listing used to lay out the flag view.

pub mod bridge;
pub mod flags;
pub mod projects;

pub use bridge::{BackendRequest, BridgeError, HostBridge, HttpHostBridge};
pub use flags::{FlagSyncClient, FlagSyncState, PendingFlagChange};
pub use projects::{project_rows, ProjectRow, ProjectsClient, ProjectsState};
