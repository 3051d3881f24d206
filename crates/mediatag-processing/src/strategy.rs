//! The per-media-class extraction seam.

use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::{ExtractionConfig, JobKind, MediaClass};
use mediatag_plugins::{BlobRef, KeyPhraseExtractor, LabelDetector, OcrEngine, Transcriber};
use std::sync::Arc;

/// Provider capabilities and thresholds shared by every extractor.
#[derive(Clone)]
pub struct Capabilities {
    pub labels: Arc<dyn LabelDetector>,
    pub key_phrases: Arc<dyn KeyPhraseExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub ocr: Arc<dyn OcrEngine>,
    pub config: ExtractionConfig,
}

/// One uploaded blob as handed to an extractor.
#[derive(Debug, Clone)]
pub struct ExtractionInput {
    pub file_key: String,
    pub original_name: String,
    /// Lower-cased, without the dot.
    pub extension: String,
    pub blob: BlobRef,
}

/// A provider job an extractor started for the job monitor to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedJob {
    pub kind: JobKind,
    pub provider_job_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Tags and transcript known now.
    Immediate { tags: Vec<String>, transcript: String },
    /// Tags arrive later through the listed jobs.
    Deferred { jobs: Vec<StartedJob> },
}

impl ExtractionOutcome {
    pub fn empty() -> Self {
        ExtractionOutcome::Immediate {
            tags: Vec::new(),
            transcript: String::new(),
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            ExtractionOutcome::Immediate { tags, .. } => tags,
            ExtractionOutcome::Deferred { .. } => &[],
        }
    }
}

/// Provider failures are logged and degrade to [`ExtractionOutcome::empty`];
/// an `Err` is reserved for failures reading the blob itself.
#[async_trait]
pub trait TagExtractor: Send + Sync {
    fn media_class(&self) -> MediaClass;

    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome>;
}
