use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use super::JobKind;

/// Media class an upload is dispatched on, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaClass {
    Image,
    PlainText,
    Pdf,
    Audio,
    Video,
    Unsupported,
}

impl Display for MediaClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaClass::Image => write!(f, "image"),
            MediaClass::PlainText => write!(f, "plain_text"),
            MediaClass::Pdf => write!(f, "pdf"),
            MediaClass::Audio => write!(f, "audio"),
            MediaClass::Video => write!(f, "video"),
            MediaClass::Unsupported => write!(f, "unsupported"),
        }
    }
}

impl FromStr for MediaClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaClass::Image),
            "plain_text" => Ok(MediaClass::PlainText),
            "pdf" => Ok(MediaClass::Pdf),
            "audio" => Ok(MediaClass::Audio),
            "video" => Ok(MediaClass::Video),
            "unsupported" => Ok(MediaClass::Unsupported),
            _ => Err(anyhow::anyhow!("Invalid media class: {}", s)),
        }
    }
}

/// One uploaded file and everything derived from it.
///
/// `file_key` doubles as the blob store key. `visual_labels` and
/// `transcript_tags` are scratch fields written by background jobs; only
/// `tags` is shown to callers. `pending_jobs` lists the async parts that have
/// not reported yet; whichever part empties it fuses the scratch fields into
/// `tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub file_key: String,
    pub original_name: String,
    pub media_class: MediaClass,
    pub content_type: String,
    pub size_bytes: i64,
    pub tags: Vec<String>,
    pub transcript: String,
    pub visual_labels: Vec<String>,
    pub transcript_tags: Vec<String>,
    pub pending_jobs: Vec<JobKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    /// A record with empty derived fields.
    pub fn new(
        file_key: impl Into<String>,
        original_name: impl Into<String>,
        media_class: MediaClass,
        content_type: impl Into<String>,
        size_bytes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            file_key: file_key.into(),
            original_name: original_name.into(),
            media_class,
            content_type: content_type.into(),
            size_bytes,
            tags: Vec::new(),
            transcript: String::new(),
            visual_labels: Vec::new(),
            transcript_tags: Vec::new(),
            pending_jobs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True while at least one background job may still write to this record.
    pub fn is_enriching(&self) -> bool {
        !self.pending_jobs.is_empty()
    }
}

#[cfg(feature = "sqlx")]
fn decode_err(column: &str, err: anyhow::Error) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: err.into(),
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for MediaRecord {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let media_class: String = row.try_get("media_class")?;
        let pending: Vec<String> = row.try_get("pending_jobs")?;
        let pending_jobs = pending
            .iter()
            .map(|s| s.parse::<JobKind>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode_err("pending_jobs", e))?;

        Ok(MediaRecord {
            file_key: row.try_get("file_key")?,
            original_name: row.try_get("original_name")?,
            media_class: media_class
                .parse()
                .map_err(|e| decode_err("media_class", e))?,
            content_type: row.try_get("content_type")?,
            size_bytes: row.try_get("size_bytes")?,
            tags: row.try_get("tags")?,
            transcript: row.try_get("transcript")?,
            visual_labels: row.try_get("visual_labels")?,
            transcript_tags: row.try_get("transcript_tags")?,
            pending_jobs,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Partial update of a record's mutable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub tags: Option<Vec<String>>,
    pub transcript: Option<String>,
    pub visual_labels: Option<Vec<String>>,
    pub transcript_tags: Option<Vec<String>>,
    pub pending_jobs: Option<Vec<JobKind>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none()
            && self.transcript.is_none()
            && self.visual_labels.is_none()
            && self.transcript_tags.is_none()
            && self.pending_jobs.is_none()
    }

    pub fn apply(&self, record: &mut MediaRecord) {
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(transcript) = &self.transcript {
            record.transcript = transcript.clone();
        }
        if let Some(labels) = &self.visual_labels {
            record.visual_labels = labels.clone();
        }
        if let Some(tags) = &self.transcript_tags {
            record.transcript_tags = tags.clone();
        }
        if let Some(pending) = &self.pending_jobs {
            record.pending_jobs = pending.clone();
        }
        record.updated_at = Utc::now();
    }
}

/// A record as returned to callers, with a freshly signed URL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaResponse {
    pub key: String,
    pub name: String,
    pub url: String,
    pub tags: Vec<String>,
    pub transcript: String,
    pub media_class: MediaClass,
    pub content_type: String,
    pub size_bytes: i64,
    /// Background enrichment still running
    pub pending: bool,
    pub created_at: DateTime<Utc>,
}

impl MediaResponse {
    pub fn from_record(record: MediaRecord, url: String) -> Self {
        Self {
            pending: record.is_enriching(),
            key: record.file_key,
            name: record.original_name,
            url,
            tags: record.tags,
            transcript: record.transcript,
            media_class: record.media_class,
            content_type: record.content_type,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub key: String,
    pub name: String,
    pub url: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscriptResponse {
    pub key: String,
    pub transcript: String,
    pub tags: Vec<String>,
    pub pending: bool,
}

/// Blob listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlobInfo {
    pub key: String,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_class_round_trips_through_str() {
        for class in [
            MediaClass::Image,
            MediaClass::PlainText,
            MediaClass::Pdf,
            MediaClass::Audio,
            MediaClass::Video,
            MediaClass::Unsupported,
        ] {
            assert_eq!(class.to_string().parse::<MediaClass>().unwrap(), class);
        }
    }

    #[test]
    fn test_patch_only_touches_set_fields() {
        let mut record = MediaRecord::new("1_a_b.mp4", "b.mp4", MediaClass::Video, "video/mp4", 10);
        record.tags = vec!["keep".to_string()];

        let patch = RecordPatch {
            visual_labels: Some(vec!["Car".to_string()]),
            ..Default::default()
        };
        patch.apply(&mut record);

        assert_eq!(record.tags, vec!["keep".to_string()]);
        assert_eq!(record.visual_labels, vec!["Car".to_string()]);
    }

    #[test]
    fn test_response_reports_pending_enrichment() {
        let mut record = MediaRecord::new("1_a_b.mp3", "b.mp3", MediaClass::Audio, "audio/mpeg", 10);
        record.pending_jobs = vec![JobKind::Transcription];

        let response = MediaResponse::from_record(record, "https://signed".to_string());
        assert!(response.pending);
        assert_eq!(response.name, "b.mp3");
    }
}
