use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediatag_core::{ExtractionJob, JobStatus};
use sqlx::{PgPool, Postgres};
use std::time::Duration;
use uuid::Uuid;

use super::JobStore;

const JOB_COLUMNS: &str = r#"
    id,
    kind,
    provider_job_id,
    file_key,
    status,
    attempts,
    max_attempts,
    next_poll_at,
    last_error,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, kind = %job.kind))]
    async fn insert(&self, job: &ExtractionJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO extraction_jobs (
                id, kind, provider_job_id, file_key, status, attempts,
                max_attempts, next_poll_at, last_error, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id)
        .bind(job.kind.to_string())
        .bind(&job.provider_job_id)
        .bind(&job.file_key)
        .bind(job.status.to_string())
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.next_poll_at)
        .bind(&job.last_error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert extraction job")?;

        tracing::debug!(file_key = %job.file_key, "Extraction job persisted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<ExtractionJob>> {
        let sql = format!("SELECT {} FROM extraction_jobs WHERE id = $1", JOB_COLUMNS);
        let job = sqlx::query_as::<Postgres, ExtractionJob>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch extraction job")?;

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn claim_due(&self, limit: i64, lease: Duration) -> Result<Vec<ExtractionJob>> {
        let sql = format!(
            r#"
            UPDATE extraction_jobs
            SET next_poll_at = NOW() + make_interval(secs => $2),
                updated_at = NOW()
            WHERE id IN (
                SELECT id
                FROM extraction_jobs
                WHERE status = 'RUNNING'
                    AND next_poll_at <= NOW()
                ORDER BY next_poll_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let jobs = sqlx::query_as::<Postgres, ExtractionJob>(&sql)
            .bind(limit)
            .bind(lease.as_secs_f64())
            .fetch_all(&self.pool)
            .await
            .context("Failed to claim due extraction jobs")?;

        Ok(jobs)
    }

    #[tracing::instrument(skip(self))]
    async fn record_poll(
        &self,
        id: Uuid,
        next_poll_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET attempts = attempts + 1,
                next_poll_at = $2,
                last_error = COALESCE($3, last_error),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(next_poll_at)
        .bind(error)
        .execute(&self.pool)
        .await
        .context("Failed to record extraction job poll")?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn finish(&self, id: Uuid, status: JobStatus, error: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET attempts = attempts + 1,
                status = $2,
                last_error = COALESCE($3, last_error),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(error)
        .execute(&self.pool)
        .await
        .context("Failed to finish extraction job")?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_record(&self, file_key: &str) -> Result<Vec<ExtractionJob>> {
        let sql = format!(
            "SELECT {} FROM extraction_jobs WHERE file_key = $1 ORDER BY created_at ASC",
            JOB_COLUMNS
        );
        let jobs = sqlx::query_as::<Postgres, ExtractionJob>(&sql)
            .bind(file_key)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list extraction jobs")?;

        Ok(jobs)
    }
}
