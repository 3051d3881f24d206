use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediatag_core::{ExtractionJob, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::JobStore;

#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<Uuid, ExtractionJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<ExtractionJob> {
        let mut jobs: Vec<_> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Make every RUNNING job due now.
    pub async fn make_all_due(&self) {
        let now = Utc::now();
        for job in self.jobs.lock().await.values_mut() {
            if job.status == JobStatus::Running {
                job.next_poll_at = now;
            }
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &ExtractionJob) -> Result<()> {
        self.jobs.lock().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ExtractionJob>> {
        Ok(self.jobs.lock().await.get(&id).cloned())
    }

    async fn claim_due(&self, limit: i64, lease: Duration) -> Result<Vec<ExtractionJob>> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(lease)?;
        let mut jobs = self.jobs.lock().await;

        let mut due: Vec<&mut ExtractionJob> = jobs
            .values_mut()
            .filter(|j| j.status == JobStatus::Running && j.next_poll_at <= now)
            .collect();
        due.sort_by_key(|j| j.next_poll_at);

        Ok(due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|job| {
                job.next_poll_at = now + lease;
                job.updated_at = now;
                job.clone()
            })
            .collect())
    }

    async fn record_poll(
        &self,
        id: Uuid,
        next_poll_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or_else(|| anyhow!("Job {} not found", id))?;
        job.attempts += 1;
        job.next_poll_at = next_poll_at;
        if let Some(error) = error {
            job.last_error = Some(error.to_string());
        }
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn finish(&self, id: Uuid, status: JobStatus, error: Option<&str>) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or_else(|| anyhow!("Job {} not found", id))?;
        job.attempts += 1;
        job.status = status;
        if let Some(error) = error {
            job.last_error = Some(error.to_string());
        }
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn list_for_record(&self, file_key: &str) -> Result<Vec<ExtractionJob>> {
        let mut jobs: Vec<_> = self
            .jobs
            .lock()
            .await
            .values()
            .filter(|j| j.file_key == file_key)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }
}
