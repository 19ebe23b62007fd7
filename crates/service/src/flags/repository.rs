use std::sync::Arc;

use async_trait::async_trait;
use common::types::ProjectFlags;
use tracing::{debug, info, warn};

use super::FLAGS_SLOT;
use crate::errors::ServiceError;
use crate::storage::KvStore;

#[async_trait]
pub trait FlagRepository: Send + Sync {
    /// Current flags; never fails because of absent or undecodable data.
    async fn get_all(&self) -> Result<ProjectFlags, ServiceError>;
    /// Merge one project's flag into the stored map and return the result.
    async fn set_flag(&self, project_id: &str, enabled: bool) -> Result<ProjectFlags, ServiceError>;
}

/// Repository over a single `KvStore` slot.
pub struct KvFlagRepository {
    store: Arc<dyn KvStore>,
}

impl KvFlagRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    async fn read_slot(&self) -> ProjectFlags {
        let raw = match self.store.get(FLAGS_SLOT).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(slot = FLAGS_SLOT, "flag slot absent; using empty map");
                return ProjectFlags::new();
            }
            Err(e) => {
                warn!(slot = FLAGS_SLOT, error = %e, "flag slot unreadable; using empty map");
                return ProjectFlags::new();
            }
        };
        match ProjectFlags::from_json(&raw) {
            Ok(flags) => flags,
            Err(e) => {
                // left in place; the next successful write replaces it
                warn!(slot = FLAGS_SLOT, error = %e, "flag slot failed to decode; using empty map");
                ProjectFlags::new()
            }
        }
    }
}

#[async_trait]
impl FlagRepository for KvFlagRepository {
    async fn get_all(&self) -> Result<ProjectFlags, ServiceError> {
        Ok(self.read_slot().await)
    }

    async fn set_flag(&self, project_id: &str, enabled: bool) -> Result<ProjectFlags, ServiceError> {
        if project_id.is_empty() {
            return Err(ServiceError::InvalidArgument("projectId required".into()));
        }

        let mut flags = self.read_slot().await;
        flags.set(project_id, enabled);
        let encoded = flags.to_json()?;
        self.store.set(FLAGS_SLOT, encoded).await?;

        info!(project_id, enabled, total = flags.len(), "project flag updated");
        Ok(flags)
    }
}
