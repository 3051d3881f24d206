//! Store, provider and job monitor wiring.

use crate::state::AppState;
use anyhow::Result;
use mediatag_core::Config;
use mediatag_db::{
    JobStore, MemoryJobStore, MemoryMetadataStore, MetadataStore, PgJobStore, PgMetadataStore,
};
use mediatag_processing::ExtractorRegistry;
use mediatag_services::{build_capabilities, build_completer, ServiceContext};
use mediatag_storage::{Storage, UrlSigner};
use mediatag_worker::{JobHandlerContext, JobMonitor};
use sqlx::PgPool;
use std::sync::Arc;

pub async fn initialize_services(
    config: &Config,
    pool: Option<PgPool>,
    storage: Arc<dyn Storage>,
    signer: Option<UrlSigner>,
) -> Result<Arc<AppState>> {
    let (metadata, jobs): (Arc<dyn MetadataStore>, Arc<dyn JobStore>) = match pool {
        Some(pool) => (
            Arc::new(PgMetadataStore::new(pool.clone())),
            Arc::new(PgJobStore::new(pool)),
        ),
        None => (
            Arc::new(MemoryMetadataStore::new()),
            Arc::new(MemoryJobStore::new()),
        ),
    };

    let completer = build_completer(config)?;
    let caps = build_capabilities(config, completer.clone()).await?;
    let registry = Arc::new(ExtractorRegistry::new(caps.clone()));

    let handler_ctx = Arc::new(JobHandlerContext::new(
        metadata.clone(),
        jobs.clone(),
        caps,
        config.jobs().clone(),
    ));
    let monitor = JobMonitor::start(handler_ctx);
    tracing::info!(
        max_workers = config.jobs().max_workers,
        poll_interval_secs = config.jobs().poll_interval.as_secs(),
        "Job monitor started"
    );

    let services = ServiceContext {
        storage,
        metadata,
        jobs,
        registry,
        monitor,
        completer,
        url_ttl: config.presigned_url_ttl(),
        max_upload_bytes: config.max_upload_size_bytes(),
    };

    Ok(Arc::new(AppState::new(services, signer)))
}
