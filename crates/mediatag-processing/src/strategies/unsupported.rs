use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::MediaClass;

use crate::strategy::{ExtractionInput, ExtractionOutcome, TagExtractor};

/// No provider calls; empty tags and transcript.
#[derive(Debug, Default)]
pub struct UnsupportedExtractor;

#[async_trait]
impl TagExtractor for UnsupportedExtractor {
    fn media_class(&self) -> MediaClass {
        MediaClass::Unsupported
    }

    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome> {
        tracing::debug!(file_key = %input.file_key, extension = %input.extension, "Unsupported file type, skipping extraction");
        Ok(ExtractionOutcome::empty())
    }
}
