//! Storage abstraction trait

use crate::StorageBackend;
use async_trait::async_trait;
use mediatag_core::BlobInfo;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid signed URL: {0}")]
    InvalidSignature(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Where a provider job can read an object directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn s3_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Key/value blob store with time-limited retrieval URLs.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key`, replacing any previous object
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Signed GET URL valid for `expires_in`
    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Every object with its size in bytes
    async fn list(&self) -> StorageResult<Vec<BlobInfo>>;

    fn backend_type(&self) -> StorageBackend;

    /// Bucket location for provider jobs that read objects themselves
    /// (transcription, video labels, OCR). `None` for non-S3 backends.
    fn object_location(&self, _key: &str) -> Option<ObjectLocation> {
        None
    }
}
