//! Storage setup and initialization

use anyhow::{Context, Result};
use mediatag_core::{Config, StorageBackend};
use mediatag_storage::{create_storage, Storage, UrlSigner};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing blob storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize blob storage")?;
    tracing::info!(backend = %storage.backend_type(), "Blob storage initialized");
    Ok(storage)
}

/// Signer for `/files/{key}` downloads, which only the local backend serves.
pub fn setup_url_signer(config: &Config) -> Result<Option<UrlSigner>> {
    if config.storage_backend() != StorageBackend::Local {
        return Ok(None);
    }
    let secret = config
        .url_signing_secret()
        .context("URL_SIGNING_SECRET must be set for local storage")?;
    let base_url = config
        .local_storage_base_url()
        .context("LOCAL_STORAGE_BASE_URL must be set for local storage")?;
    let signer = UrlSigner::new(secret.as_bytes(), base_url)?;
    Ok(Some(signer))
}
