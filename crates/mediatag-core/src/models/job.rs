use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of long-running provider job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Transcription,
    VideoLabels,
}

impl Display for JobKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobKind::Transcription => write!(f, "transcription"),
            JobKind::VideoLabels => write!(f, "video_labels"),
        }
    }
}

impl FromStr for JobKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcription" => Ok(JobKind::Transcription),
            "video_labels" => Ok(JobKind::VideoLabels),
            _ => Err(anyhow::anyhow!("Invalid job kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(JobStatus::Running),
            "SUCCEEDED" => Ok(JobStatus::Succeeded),
            "FAILED" => Ok(JobStatus::Failed),
            "TIMED_OUT" => Ok(JobStatus::TimedOut),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// A provider job being polled on behalf of one media record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: Uuid,
    pub kind: JobKind,
    /// Identifier issued by the provider (job name or job id)
    pub provider_job_id: String,
    pub file_key: String,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_poll_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionJob {
    /// A RUNNING job whose first poll is due at `first_poll_at`.
    pub fn running(
        kind: JobKind,
        provider_job_id: impl Into<String>,
        file_key: impl Into<String>,
        max_attempts: i32,
        first_poll_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            provider_job_id: provider_job_id.into(),
            file_key: file_key.into(),
            status: JobStatus::Running,
            attempts: 0,
            max_attempts,
            next_poll_at: first_poll_at,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether one more unsuccessful poll would exhaust the attempt budget.
    pub fn is_last_attempt(&self) -> bool {
        self.attempts + 1 >= self.max_attempts
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for ExtractionJob {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;

        Ok(ExtractionJob {
            id: row.try_get("id")?,
            kind: kind.parse().map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: e.into(),
            })?,
            provider_job_id: row.try_get("provider_job_id")?,
            file_key: row.try_get("file_key")?,
            status: status.parse().map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?,
            attempts: row.try_get("attempts")?,
            max_attempts: row.try_get("max_attempts")?,
            next_poll_at: row.try_get("next_poll_at")?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(JobStatus::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!("SUCCEEDED".parse::<JobStatus>().unwrap(), JobStatus::Succeeded);
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_last_attempt_boundary() {
        let mut job = ExtractionJob::running(JobKind::Transcription, "job", "key", 3, Utc::now());
        assert!(!job.is_last_attempt());
        job.attempts = 2;
        assert!(job.is_last_attempt());
    }
}
