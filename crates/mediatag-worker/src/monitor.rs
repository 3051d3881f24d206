//! Job monitor: worker pool, polling and terminal-state handling.
//!
//! Shutdown: [`JobMonitor::shutdown`] stops the pool from claiming more jobs.
//! Jobs already being polled run to completion; anything left RUNNING is
//! picked up again on the next start because job state lives in the store.

use anyhow::{Context, Result};
use chrono::Utc;
use mediatag_core::{ExtractionJob, JobError, JobKind, JobMonitorConfig, JobStatus};
use mediatag_db::JobStore;
use mediatag_plugins::JobPoll;
use mediatag_processing::StartedJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

use crate::completion::{complete_transcription, complete_video_labels, release_part};
use crate::context::JobHandlerContext;

#[derive(Clone)]
pub struct JobMonitor {
    jobs: Arc<dyn JobStore>,
    config: JobMonitorConfig,
    shutdown_tx: mpsc::Sender<()>,
}

impl JobMonitor {
    /// Start the worker pool over `ctx.jobs`.
    pub fn start(ctx: Arc<JobHandlerContext>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let jobs = ctx.jobs.clone();
        let config = ctx.config.clone();

        tokio::spawn(async move {
            Self::worker_pool(ctx, shutdown_rx).await;
        });

        Self {
            jobs,
            config,
            shutdown_tx,
        }
    }

    /// A monitor that only registers jobs; some other process polls them.
    pub fn new_no_worker(jobs: Arc<dyn JobStore>, config: JobMonitorConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        drop(shutdown_rx);
        Self {
            jobs,
            config,
            shutdown_tx,
        }
    }

    /// Persist a started provider job so it gets polled for `file_key`.
    #[tracing::instrument(skip(self, started), fields(job_kind = %started.kind))]
    pub async fn register(&self, file_key: &str, started: &StartedJob) -> Result<ExtractionJob> {
        let max_attempts = match started.kind {
            JobKind::Transcription => self.config.transcription_max_attempts,
            JobKind::VideoLabels => self.config.video_label_max_attempts,
        };
        let first_poll_at = Utc::now() + chrono::Duration::from_std(self.config.poll_interval)?;
        let job = ExtractionJob::running(
            started.kind,
            &started.provider_job_id,
            file_key,
            max_attempts,
            first_poll_at,
        );

        self.jobs
            .insert(&job)
            .await
            .context("Failed to persist extraction job")?;

        tracing::info!(
            job_id = %job.id,
            provider_job_id = %job.provider_job_id,
            max_attempts = job.max_attempts,
            "Extraction job registered"
        );
        Ok(job)
    }

    async fn worker_pool(ctx: Arc<JobHandlerContext>, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            max_workers = ctx.config.max_workers,
            poll_interval_secs = ctx.config.poll_interval.as_secs(),
            "Job monitor started"
        );

        let semaphore = Arc::new(Semaphore::new(ctx.config.max_workers.max(1)));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Job monitor shutting down");
                    break;
                }
                _ = sleep(ctx.config.tick) => {
                    Self::claim_and_dispatch(&ctx, &semaphore).await;
                }
            }
        }

        tracing::info!("Job monitor stopped");
    }

    async fn claim_and_dispatch(ctx: &Arc<JobHandlerContext>, semaphore: &Arc<Semaphore>) {
        let available = semaphore.available_permits();
        if available == 0 {
            tracing::debug!("No workers available, skipping claim");
            return;
        }

        let claimed = match ctx
            .jobs
            .claim_due(available as i64, ctx.config.poll_interval)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim due jobs");
                return;
            }
        };

        for job in claimed {
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    // Lease expires and the job is claimed again later.
                    tracing::debug!(job_id = %job.id, "Worker pool full, job deferred");
                    break;
                }
            };
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_job(&ctx, job).await {
                    tracing::error!(error = %e, "Failed to record job poll");
                }
            });
        }
    }

    pub async fn shutdown(&self) {
        tracing::info!("Initiating job monitor shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Claim every due job and process them one by one. Returns the number of
/// jobs polled.
pub async fn run_due_jobs(ctx: &JobHandlerContext) -> Result<usize> {
    let claimed = ctx
        .jobs
        .claim_due(i64::MAX, ctx.config.poll_interval)
        .await?;
    let count = claimed.len();
    for job in claimed {
        process_job(ctx, job).await?;
    }
    Ok(count)
}

/// Poll the provider once. On success the result has already been written
/// to the record.
pub async fn poll_job(
    ctx: &JobHandlerContext,
    job: &ExtractionJob,
) -> Result<JobPoll<()>, JobError> {
    match job.kind {
        JobKind::Transcription => {
            match ctx.caps.transcriber.poll_job(&job.provider_job_id).await? {
                JobPoll::InProgress => Ok(JobPoll::InProgress),
                JobPoll::Failed(reason) => Ok(JobPoll::Failed(reason)),
                JobPoll::Succeeded(uri) => {
                    let transcript = ctx.caps.transcriber.fetch_transcript(&uri).await?;
                    complete_transcription(ctx, job, transcript).await?;
                    Ok(JobPoll::Succeeded(()))
                }
            }
        }
        JobKind::VideoLabels => {
            match ctx.caps.labels.poll_video_label_job(&job.provider_job_id).await? {
                JobPoll::InProgress => Ok(JobPoll::InProgress),
                JobPoll::Failed(reason) => Ok(JobPoll::Failed(reason)),
                JobPoll::Succeeded(labels) => {
                    complete_video_labels(ctx, job, &labels).await?;
                    Ok(JobPoll::Succeeded(()))
                }
            }
        }
    }
}

#[tracing::instrument(
    skip(ctx, job),
    fields(job_id = %job.id, job_kind = %job.kind, file_key = %job.file_key, attempt = job.attempts + 1)
)]
async fn process_job(ctx: &JobHandlerContext, job: ExtractionJob) -> Result<()> {
    let start = std::time::Instant::now();
    let result = poll_job(ctx, &job).await;
    let next_poll_at = Utc::now() + chrono::Duration::from_std(ctx.config.poll_interval)?;

    match result {
        Ok(JobPoll::Succeeded(())) => {
            ctx.jobs
                .finish(job.id, JobStatus::Succeeded, None)
                .await
                .context("Failed to mark job as succeeded")?;
            tracing::info!(
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Extraction job succeeded"
            );
        }
        Ok(JobPoll::Failed(reason)) => {
            tracing::warn!(reason = %reason, "Extraction job failed at provider");
            finish_without_result(ctx, &job, JobStatus::Failed, &reason).await?;
        }
        Ok(JobPoll::InProgress) if job.is_last_attempt() => {
            tracing::warn!(max_attempts = job.max_attempts, "Extraction job timed out");
            finish_without_result(ctx, &job, JobStatus::TimedOut, "Polling attempts exhausted")
                .await?;
        }
        Ok(JobPoll::InProgress) => {
            tracing::debug!("Extraction job still running");
            ctx.jobs
                .record_poll(job.id, next_poll_at, None)
                .await
                .context("Failed to record poll")?;
        }
        Err(e) if !e.is_recoverable() => {
            tracing::error!(error = %e, "Extraction job failed with unrecoverable error");
            finish_without_result(ctx, &job, JobStatus::Failed, &e.to_string()).await?;
        }
        Err(e) if job.is_last_attempt() => {
            tracing::warn!(error = %e, "Extraction job timed out after poll error");
            finish_without_result(ctx, &job, JobStatus::TimedOut, &e.to_string()).await?;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Poll failed, retrying on next interval");
            ctx.jobs
                .record_poll(job.id, next_poll_at, Some(&e.to_string()))
                .await
                .context("Failed to record poll")?;
        }
    }
    Ok(())
}

async fn finish_without_result(
    ctx: &JobHandlerContext,
    job: &ExtractionJob,
    status: JobStatus,
    error: &str,
) -> Result<()> {
    if let Err(e) = release_part(ctx, job).await {
        tracing::error!(error = %e, "Failed to release job part on record");
    }
    ctx.jobs
        .finish(job.id, status, Some(error))
        .await
        .with_context(|| format!("Failed to mark job as {}", status))
}
