//! Service context: every collaborator the services need, built once at
//! startup and shared by reference.

use mediatag_core::AppError;
use mediatag_db::{JobStore, MetadataStore};
use mediatag_plugins::TextCompleter;
use mediatag_processing::ExtractorRegistry;
use mediatag_storage::Storage;
use mediatag_worker::JobMonitor;
use std::sync::Arc;
use std::time::Duration;

use crate::error::storage_error;

#[derive(Clone)]
pub struct ServiceContext {
    pub storage: Arc<dyn Storage>,
    pub metadata: Arc<dyn MetadataStore>,
    pub jobs: Arc<dyn JobStore>,
    pub registry: Arc<ExtractorRegistry>,
    pub monitor: JobMonitor,
    /// Natural-language search returns nothing when unset.
    pub completer: Option<Arc<dyn TextCompleter>>,
    pub url_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl ServiceContext {
    /// Fresh retrieval URL for `key`.
    pub async fn presign(&self, key: &str) -> Result<String, AppError> {
        self.storage
            .presigned_get_url(key, self.url_ttl)
            .await
            .map_err(storage_error)
    }

    /// Like [`presign`](Self::presign) but logs and returns an empty URL on
    /// failure, for listings where one bad key should not fail the page.
    pub async fn presign_or_empty(&self, key: &str) -> String {
        match self.presign(key).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(file_key = %key, error = %e, "Failed to sign retrieval URL");
                String::new()
            }
        }
    }
}
