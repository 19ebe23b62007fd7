use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::{debug, warn};

use super::KvStore;
use crate::errors::ServiceError;

/// JSON file-backed slot store.
///
/// All slots live in one JSON object `{"slot": "<text>"}` that is cached in
/// memory and written through on every `set`. Writes go to a sibling temp
/// file first and are renamed into place.
pub struct FileKvStore {
    inner: RwLock<HashMap<String, String>>,
    file_path: PathBuf,
}

impl FileKvStore {
    /// Open the store at `path`. Creates the file with an empty object if
    /// missing; a file that cannot be decoded is logged and read as empty.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(ServiceError::storage)?;
        }

        let map: HashMap<String, String> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %file_path.display(), error = %e, "kv store file is corrupt; starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty: HashMap<String, String> = HashMap::new();
                let data = serde_json::to_vec(&empty).map_err(ServiceError::storage)?;
                fs::write(&file_path, data).await.map_err(ServiceError::storage)?;
                empty
            }
            Err(e) => return Err(ServiceError::storage(e)),
        };

        debug!(path = %file_path.display(), slots = map.len(), "kv store opened");
        Ok(Arc::new(Self { inner: RwLock::new(map), file_path }))
    }

    async fn save(&self, map: &HashMap<String, String>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec(map).map_err(ServiceError::storage)?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await.map_err(ServiceError::storage)?;
        fs::rename(&tmp, &self.file_path).await.map_err(ServiceError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        next.insert(key.to_string(), value);
        // cache only changes once the file write went through
        self.save(&next).await?;
        *map = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{tag}_{}", uuid::Uuid::new_v4())).join("kv.json")
    }

    #[tokio::test]
    async fn set_persists_across_reopen() -> Result<(), anyhow::Error> {
        let tmp = temp_path("file_kv_store");
        let store = FileKvStore::new(&tmp).await?;

        assert_eq!(store.get("project-flags").await?, None);

        store.set("project-flags", r#"{"A":true}"#.into()).await?;
        store.set("other", "x".into()).await?;
        assert_eq!(store.get("project-flags").await?.as_deref(), Some(r#"{"A":true}"#));

        let reopened = FileKvStore::new(&tmp).await?;
        assert_eq!(reopened.get("project-flags").await?.as_deref(), Some(r#"{"A":true}"#));
        assert_eq!(reopened.get("other").await?.as_deref(), Some("x"));

        let _ = fs::remove_dir_all(tmp.parent().unwrap()).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_opens_empty() -> Result<(), anyhow::Error> {
        let tmp = temp_path("file_kv_corrupt");
        fs::create_dir_all(tmp.parent().unwrap()).await?;
        fs::write(&tmp, b"{not json").await?;

        let store = FileKvStore::new(&tmp).await?;
        assert_eq!(store.get("project-flags").await?, None);

        store.set("project-flags", "{}".into()).await?;
        let raw = fs::read_to_string(&tmp).await?;
        assert_eq!(raw, r#"{"project-flags":"{}"}"#);

        let _ = fs::remove_dir_all(tmp.parent().unwrap()).await;
        Ok(())
    }
}
