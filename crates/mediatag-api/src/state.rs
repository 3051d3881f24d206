//! Application state shared by every handler.

use mediatag_core::StorageBackend;
use mediatag_services::ServiceContext;
use mediatag_storage::UrlSigner;

pub struct AppState {
    pub services: ServiceContext,
    /// Verifies `/files/{key}` downloads; only set for the local backend.
    pub signer: Option<UrlSigner>,
}

impl AppState {
    pub fn new(services: ServiceContext, signer: Option<UrlSigner>) -> Self {
        Self { services, signer }
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.services.storage.backend_type()
    }
}
