//! Persisted provider jobs polled by the background monitor.

mod memory;
mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediatag_core::{ExtractionJob, JobStatus};
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &ExtractionJob) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<ExtractionJob>>;

    /// Claim up to `limit` RUNNING jobs whose poll is due.
    ///
    /// Claimed jobs have `next_poll_at` pushed `lease` into the future so no
    /// other worker picks them up while they are being polled.
    async fn claim_due(&self, limit: i64, lease: Duration) -> Result<Vec<ExtractionJob>>;

    /// Count one non-terminal poll and schedule the next one.
    async fn record_poll(
        &self,
        id: Uuid,
        next_poll_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> Result<()>;

    /// Move a job to a terminal status, counting the final poll.
    async fn finish(&self, id: Uuid, status: JobStatus, error: Option<&str>) -> Result<()>;

    async fn list_for_record(&self, file_key: &str) -> Result<Vec<ExtractionJob>>;
}
