use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::MediaClass;

use crate::fusion::rank_labels;
use crate::strategy::{Capabilities, ExtractionInput, ExtractionOutcome, TagExtractor};

/// Top image labels from the label detection capability.
pub struct ImageExtractor {
    caps: Capabilities,
}

impl ImageExtractor {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }
}

#[async_trait]
impl TagExtractor for ImageExtractor {
    fn media_class(&self) -> MediaClass {
        MediaClass::Image
    }

    #[tracing::instrument(skip(self, input), fields(file_key = %input.file_key))]
    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome> {
        let cfg = &self.caps.config;
        let labels = match self
            .caps
            .labels
            .detect_image_labels(
                &input.blob,
                cfg.image_max_labels,
                cfg.image_request_min_confidence,
            )
            .await
        {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!(error = %e, "Image label detection failed, storing without tags");
                return Ok(ExtractionOutcome::empty());
            }
        };

        let tags = rank_labels(&labels, cfg.image_keep_min_confidence, cfg.image_top_n);
        tracing::debug!(detected = labels.len(), kept = tags.len(), "Image labels ranked");

        Ok(ExtractionOutcome::Immediate {
            tags,
            transcript: String::new(),
        })
    }
}
