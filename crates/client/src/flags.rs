//! Client-side project flag state.
//!
//! Writes are optimistic: the local map changes first, the backend write
//! follows, and a failed write is compensated by restoring only the touched
//! key. Fetches replace the whole map on success and leave the last known
//! map in place on failure.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::types::ProjectFlags;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bridge::{BackendRequest, BridgeError, HostBridge};

/// Backend endpoint holding the global flag map.
pub const FLAGS_PATH: &str = "project-flags";

#[derive(Clone, Debug, PartialEq)]
pub struct FlagSyncState {
    pub flags: ProjectFlags,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for FlagSyncState {
    fn default() -> Self {
        // nothing has been fetched yet
        Self { flags: ProjectFlags::new(), loading: true, error: None }
    }
}

/// A local change that has been shown but not yet confirmed.
///
/// Consumed by exactly one of [`FlagSyncClient::commit`] or
/// [`FlagSyncClient::compensate`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a tentative change must be committed or compensated"]
pub struct PendingFlagChange {
    pub project_id: String,
    pub previous: Option<bool>,
    pub target: bool,
}

impl PendingFlagChange {
    /// Value restored on failure. An absent key comes back as `false`.
    pub fn revert_to(&self) -> bool {
        self.previous.unwrap_or(false)
    }
}

/// Holder of the client-visible flag map. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FlagSyncClient {
    bridge: Arc<dyn HostBridge>,
    state: Arc<Mutex<FlagSyncState>>,
}

impl FlagSyncClient {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self { bridge, state: Arc::new(Mutex::new(FlagSyncState::default())) }
    }

    fn lock(&self) -> MutexGuard<'_, FlagSyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> FlagSyncState {
        self.lock().clone()
    }

    pub fn is_enabled(&self, project_id: &str) -> bool {
        self.lock().flags.is_enabled(project_id)
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Reload the full map from the backend.
    ///
    /// Success replaces the local map wholesale, so keys changed elsewhere
    /// become visible. Failure keeps the stale map and records the error.
    pub async fn fetch_flags(&self) -> Result<ProjectFlags, BridgeError> {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.bridge.call_backend(FLAGS_PATH, BackendRequest::get()).await;

        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(body) => {
                let flags = decode_flags(body);
                debug!(count = flags.len(), "project flags fetched");
                state.flags = flags.clone();
                Ok(flags)
            }
            Err(e) => {
                warn!(error = %e, "project flags fetch failed");
                state.error = Some(format!("Failed to load project flags: {e}"));
                Err(e)
            }
        }
    }

    /// Record `target` locally before anything is sent.
    pub fn apply_tentative(&self, project_id: &str, target: bool) -> PendingFlagChange {
        let previous = self.lock().flags.set(project_id, target);
        PendingFlagChange { project_id: project_id.to_string(), previous, target }
    }

    /// Flip the local value and stage the change. Absent counts as `false`.
    fn apply_toggle(&self, project_id: &str) -> PendingFlagChange {
        let mut state = self.lock();
        let target = !state.flags.is_enabled(project_id);
        let previous = state.flags.set(project_id, target);
        PendingFlagChange { project_id: project_id.to_string(), previous, target }
    }

    /// The backend accepted the change; the local map already shows it.
    pub fn commit(&self, change: PendingFlagChange) {
        debug!(project_id = %change.project_id, enabled = change.target, "project flag confirmed");
    }

    /// The backend rejected the change: restore this one key and record why.
    pub fn compensate(&self, change: PendingFlagChange, cause: &BridgeError) {
        let restored = change.revert_to();
        warn!(project_id = %change.project_id, restored, error = %cause, "project flag write failed; reverting");
        let mut state = self.lock();
        state.flags.set(change.project_id.as_str(), restored);
        state.error = Some(format!("Failed to update project flag {}: {cause}", change.project_id));
    }

    async fn write_through(&self, change: PendingFlagChange) -> Result<bool, BridgeError> {
        let body = json!({ "projectId": change.project_id, "enabled": change.target });
        match self.bridge.call_backend(FLAGS_PATH, BackendRequest::put(body)).await {
            Ok(_) => {
                let enabled = change.target;
                self.commit(change);
                Ok(enabled)
            }
            Err(e) => {
                self.compensate(change, &e);
                Err(e)
            }
        }
    }

    /// Flip one project's flag and wait for the backend to confirm it.
    /// Returns the confirmed value.
    pub async fn toggle(&self, project_id: &str) -> Result<bool, BridgeError> {
        let change = self.apply_toggle(project_id);
        self.write_through(change).await
    }

    /// Flip one project's flag now and confirm it in the background.
    ///
    /// The local map is updated before this returns; the handle resolves
    /// once the write has been committed or compensated.
    pub fn spawn_toggle(&self, project_id: &str) -> JoinHandle<Result<bool, BridgeError>> {
        let change = self.apply_toggle(project_id);
        let client = self.clone();
        tokio::spawn(async move { client.write_through(change).await })
    }

    /// Set an explicit value with the same optimistic discipline as `toggle`.
    pub async fn set_flag(&self, project_id: &str, enabled: bool) -> Result<bool, BridgeError> {
        let change = self.apply_tentative(project_id, enabled);
        self.write_through(change).await
    }
}

/// `{"flags": {...}}` -> map. Anything else reads as empty.
fn decode_flags(body: Value) -> ProjectFlags {
    match body {
        Value::Object(mut obj) => match obj.remove("flags") {
            Some(Value::Null) | None => ProjectFlags::new(),
            Some(flags) => serde_json::from_value(flags).unwrap_or_else(|e| {
                warn!(error = %e, "project flags response not a boolean map");
                ProjectFlags::new()
            }),
        },
        _ => ProjectFlags::new(),
    }
}
