//! Dependencies shared by the monitor's job handlers.

use mediatag_core::JobMonitorConfig;
use mediatag_db::{JobStore, MetadataStore};
use mediatag_processing::Capabilities;
use std::sync::Arc;

#[derive(Clone)]
pub struct JobHandlerContext {
    pub metadata: Arc<dyn MetadataStore>,
    pub jobs: Arc<dyn JobStore>,
    pub caps: Capabilities,
    pub config: JobMonitorConfig,
}

impl JobHandlerContext {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        jobs: Arc<dyn JobStore>,
        caps: Capabilities,
        config: JobMonitorConfig,
    ) -> Self {
        Self {
            metadata,
            jobs,
            caps,
            config,
        }
    }
}
