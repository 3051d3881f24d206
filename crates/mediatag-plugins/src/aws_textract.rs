//! AWS Textract OCR.
//!
//! Single images go through the synchronous `DetectDocumentText` call. PDFs
//! need the asynchronous text detection API, which is polled here until it
//! settles so callers see one blocking `extract_text`.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{Block, BlockType, Document, DocumentLocation, JobStatus, S3Object};
use aws_sdk_textract::Client as TextractClient;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::capabilities::{BlobRef, DocumentType, OcrEngine};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_POLLS: u32 = 120;

pub struct AwsTextractEngine {
    client: TextractClient,
    poll_interval: Duration,
    max_polls: u32,
}

impl Debug for AwsTextractEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AwsTextractEngine")
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .finish()
    }
}

impl AwsTextractEngine {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: TextractClient::new(config),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    fn s3_object(blob: &BlobRef) -> Result<S3Object> {
        let location = blob.require_location()?;
        Ok(S3Object::builder()
            .bucket(&location.bucket)
            .name(&location.key)
            .build())
    }

    async fn detect_image_text(&self, blob: &BlobRef) -> Result<String> {
        let document = match (&blob.location, &blob.bytes) {
            (Some(_), _) => Document::builder().s3_object(Self::s3_object(blob)?).build(),
            (None, Some(bytes)) => Document::builder()
                .bytes(Blob::new(bytes.to_vec()))
                .build(),
            (None, None) => bail!("Blob {} has neither an S3 location nor bytes", blob.key),
        };

        let response = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await
            .context("Failed to detect document text")?;

        Ok(join_lines(response.blocks()))
    }

    async fn detect_pdf_text(&self, blob: &BlobRef) -> Result<String> {
        let location = DocumentLocation::builder()
            .s3_object(Self::s3_object(blob)?)
            .build();

        let job_id = self
            .client
            .start_document_text_detection()
            .document_location(location)
            .send()
            .await
            .context("Failed to start document text detection")?
            .job_id()
            .map(|s| s.to_string())
            .context("Text detection job id missing from response")?;

        tracing::debug!(file_key = %blob.key, textract_job_id = %job_id, "Textract job started");

        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let first = self
                .client
                .get_document_text_detection()
                .job_id(&job_id)
                .send()
                .await
                .context("Failed to get document text detection")?;

            match first.job_status() {
                Some(JobStatus::Succeeded) | Some(JobStatus::PartialSuccess) => {}
                Some(JobStatus::Failed) => {
                    let reason = first.status_message().unwrap_or("Unknown error");
                    return Err(anyhow!("Textract job {} failed: {}", job_id, reason));
                }
                _ => continue,
            }

            let mut lines = vec![join_lines(first.blocks())];
            let mut next_token = first.next_token().map(|s| s.to_string());
            while let Some(token) = next_token.take() {
                let page = self
                    .client
                    .get_document_text_detection()
                    .job_id(&job_id)
                    .next_token(token)
                    .send()
                    .await
                    .context("Failed to fetch text detection page")?;
                lines.push(join_lines(page.blocks()));
                next_token = page.next_token().map(|s| s.to_string());
            }

            lines.retain(|l| !l.is_empty());
            return Ok(lines.join("\n"));
        }

        Err(anyhow!(
            "Textract job {} did not finish after {} polls",
            job_id,
            self.max_polls
        ))
    }
}

fn join_lines(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter(|b| b.block_type() == Some(&BlockType::Line))
        .filter_map(|b| b.text())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl OcrEngine for AwsTextractEngine {
    async fn extract_text(&self, blob: &BlobRef, doc_type: DocumentType) -> Result<String> {
        let start = std::time::Instant::now();
        let text = match doc_type {
            DocumentType::Image => self.detect_image_text(blob).await?,
            DocumentType::Pdf => self.detect_pdf_text(blob).await?,
        };

        tracing::debug!(
            file_key = %blob.key,
            chars = text.chars().count(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Textract OCR completed"
        );

        Ok(text)
    }
}
