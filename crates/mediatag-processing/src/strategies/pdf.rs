use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use mediatag_core::MediaClass;
use mediatag_plugins::DocumentType;

use super::text::text_tags;
use crate::strategy::{Capabilities, ExtractionInput, ExtractionOutcome, TagExtractor};

/// Text layer first, OCR when the text layer is too thin.
pub struct PdfExtractor {
    caps: Capabilities,
}

impl PdfExtractor {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    async fn ocr_text(&self, input: &ExtractionInput) -> String {
        match self.caps.ocr.extract_text(&input.blob, DocumentType::Pdf).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "PDF OCR failed");
                String::new()
            }
        }
    }
}

#[cfg(feature = "pdf")]
async fn text_layer(bytes: Bytes) -> String {
    let extracted =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
    match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "No readable PDF text layer");
            String::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "PDF text extraction task failed");
            String::new()
        }
    }
}

#[cfg(not(feature = "pdf"))]
async fn text_layer(_bytes: Bytes) -> String {
    String::new()
}

fn char_count(text: &str) -> usize {
    text.trim().chars().count()
}

#[async_trait]
impl TagExtractor for PdfExtractor {
    fn media_class(&self) -> MediaClass {
        MediaClass::Pdf
    }

    #[tracing::instrument(skip(self, input), fields(file_key = %input.file_key))]
    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome> {
        let cfg = &self.caps.config;
        let bytes = input
            .blob
            .bytes
            .clone()
            .ok_or_else(|| anyhow::anyhow!("PDF blob {} was not loaded", input.file_key))?;

        let mut text = text_layer(bytes).await;
        if char_count(&text) < cfg.pdf_min_text_chars {
            tracing::debug!(
                text_layer_chars = char_count(&text),
                "PDF text layer too short, falling back to OCR"
            );
            text = self.ocr_text(input).await;
            if char_count(&text) < cfg.ocr_min_text_chars {
                tracing::info!("PDF has no usable text");
                return Ok(ExtractionOutcome::empty());
            }
        }

        let text = text.trim().to_string();
        let tags = text_tags(&self.caps, &text).await;
        Ok(ExtractionOutcome::Immediate {
            tags,
            transcript: text,
        })
    }
}
