//! In-process blob store, used for development and tests.

use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use mediatag_core::BlobInfo;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<BTreeMap<String, StoredBlob>>>,
    base_url: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieval URLs become `{base_url}/{key}?expires=...` instead of `memory://`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            blobs: Arc::default(),
            base_url: Some(base_url.into().trim_end_matches('/').to_string()),
        }
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(key)
            .map(|b| b.content_type.clone())
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        tracing::debug!(key = %key, size_bytes = data.len(), "Memory storage upload");
        self.blobs.write().await.insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(key)
            .map(|b| b.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        validate_key(key)?;
        let expires = chrono::Utc::now().timestamp() + expires_in.as_secs() as i64;
        let base = self.base_url.as_deref().unwrap_or("memory:/");
        Ok(format!(
            "{}/{}?expires={}",
            base,
            urlencoding::encode(key),
            expires
        ))
    }

    async fn list(&self) -> StorageResult<Vec<BlobInfo>> {
        Ok(self
            .blobs
            .read()
            .await
            .iter()
            .map(|(key, blob)| BlobInfo {
                key: key.clone(),
                size: blob.data.len() as u64,
            })
            .collect())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
