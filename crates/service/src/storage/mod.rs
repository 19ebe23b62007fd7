//! Storage abstractions for the service layer
//!
//! A global key-value store of named text slots. Each slot is read and
//! written in full; there is no field-level access and no compare-and-swap.

use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod file_store;
pub mod memory_store;

pub use file_store::FileKvStore;
pub use memory_store::MemoryKvStore;

/// Trait abstraction for the slot store.
/// Implementations can be file-backed, in-process, or a remote KV.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a slot; `Ok(None)` when it has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    /// Replace a slot's full value.
    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError>;
}
