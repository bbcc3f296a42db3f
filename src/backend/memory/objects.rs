use axum::async_trait;
use dashmap::DashMap;

use crate::backend::{ObjectStore, StorageError, StoredObject};

/// Blob store keyed by object path. URLs point back at this server's media route.
pub struct MemoryObjectStore {
    public_base_url: String,
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            objects: DashMap::new(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.starts_with('/') {
            return Err(StorageError::Backend(format!("invalid object key: {key:?}")));
        }
        self.objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, StorageError> {
        if !self.objects.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn download(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .get(key)
            .map(|o| o.value().clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
