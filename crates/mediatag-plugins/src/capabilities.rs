//! Capability traits and the value types they exchange.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use mediatag_core::JobError;
use mediatag_storage::ObjectLocation;

/// A stored blob as seen by a provider: its key, its bucket location when
/// the provider can read it directly, and its bytes when already loaded.
#[derive(Debug, Clone)]
pub struct BlobRef {
    pub key: String,
    pub location: Option<ObjectLocation>,
    pub bytes: Option<Bytes>,
}

impl BlobRef {
    pub fn new(key: impl Into<String>, location: Option<ObjectLocation>) -> Self {
        Self {
            key: key.into(),
            location,
            bytes: None,
        }
    }

    pub fn with_bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.bytes = Some(bytes.into());
        self
    }

    /// Bucket location, required by providers that run jobs against S3.
    pub fn require_location(&self) -> Result<&ObjectLocation> {
        self.location.as_ref().ok_or_else(|| {
            anyhow!(
                "Blob {} is not in S3; this provider requires the S3 storage backend",
                self.key
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLabel {
    pub name: String,
    /// 0-100
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyPhrase {
    pub text: String,
    /// 0-1
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Image,
    Pdf,
}

/// State of a long-running provider job at one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPoll<T> {
    InProgress,
    Succeeded(T),
    Failed(String),
}

#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_image_labels(
        &self,
        blob: &BlobRef,
        max_labels: i32,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>>;

    /// Start label detection over a video; returns the provider job id.
    async fn start_video_label_job(&self, blob: &BlobRef, min_confidence: f32) -> Result<String>;

    /// Per-frame labels once the job has succeeded.
    async fn poll_video_label_job(
        &self,
        job_id: &str,
    ) -> Result<JobPoll<Vec<DetectedLabel>>, JobError>;
}

#[async_trait]
pub trait KeyPhraseExtractor: Send + Sync {
    /// Salient phrases of `text`; input beyond `max_bytes` is dropped.
    async fn extract_key_phrases(&self, text: &str, max_bytes: usize) -> Result<Vec<KeyPhrase>>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Start a transcription job; returns the job name to poll.
    async fn start_job(&self, blob: &BlobRef, media_format: &str, language: &str)
        -> Result<String>;

    /// On success carries the transcript location.
    async fn poll_job(&self, job_id: &str) -> Result<JobPoll<String>, JobError>;

    /// Download the transcript text from a location returned by `poll_job`.
    async fn fetch_transcript(&self, transcript_uri: &str) -> Result<String>;
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, blob: &BlobRef, doc_type: DocumentType) -> Result<String>;
}

#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a char.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        // 'é' is two bytes
        assert_eq!(truncate_utf8("héllo", 2), "h");
    }

    #[test]
    fn test_require_location_without_s3() {
        let blob = BlobRef::new("1_a_clip.mp4", None);
        let err = blob.require_location().unwrap_err();
        assert!(err.to_string().contains("S3"));
    }
}
