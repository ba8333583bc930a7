//! In-memory document store for tests and the storage-free dev mode

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{DocumentStore, StorageError};

#[derive(Default)]
pub struct MemoryDocumentStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let key = format!("{}/{}", bucket, path);
        self.objects
            .write()
            .map_err(|e| StorageError::Upload(e.to_string()))?
            .insert(key.clone(), bytes);
        Ok(format!("local://{}", key))
    }
}
