//! AWS Rekognition label detection for images and videos

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_rekognition::error::SdkError;
use aws_sdk_rekognition::operation::get_label_detection::GetLabelDetectionError;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Image, LabelDetectionSortBy, S3Object, Video, VideoJobStatus};
use aws_sdk_rekognition::Client as RekognitionClient;
use mediatag_core::JobError;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::capabilities::{BlobRef, DetectedLabel, JobPoll, LabelDetector};

pub struct AwsRekognitionDetector {
    client: RekognitionClient,
}

impl Debug for AwsRekognitionDetector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AwsRekognitionDetector").finish()
    }
}

impl AwsRekognitionDetector {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: RekognitionClient::new(config),
        }
    }

    fn image_for(blob: &BlobRef) -> Result<Image> {
        if let Some(location) = &blob.location {
            let object = S3Object::builder()
                .bucket(&location.bucket)
                .name(&location.key)
                .build();
            return Ok(Image::builder().s3_object(object).build());
        }

        let bytes = blob
            .bytes
            .as_ref()
            .ok_or_else(|| anyhow!("Blob {} has neither an S3 location nor bytes", blob.key))?;
        Ok(Image::builder().bytes(Blob::new(bytes.to_vec())).build())
    }
}

/// Job ids the provider does not know about will never succeed.
fn classify_poll_error(err: SdkError<GetLabelDetectionError>) -> JobError {
    let permanent = err
        .as_service_error()
        .map(|e| e.is_resource_not_found_exception() || e.is_invalid_parameter_exception())
        .unwrap_or(false);
    let err = anyhow::Error::new(err).context("Failed to get label detection status");
    if permanent {
        JobError::unrecoverable(err)
    } else {
        JobError::recoverable(err)
    }
}

#[async_trait]
impl LabelDetector for AwsRekognitionDetector {
    async fn detect_image_labels(
        &self,
        blob: &BlobRef,
        max_labels: i32,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .detect_labels()
            .image(Self::image_for(blob)?)
            .max_labels(max_labels)
            .min_confidence(min_confidence)
            .send()
            .await
            .context("Failed to detect labels")?;

        let labels: Vec<DetectedLabel> = response
            .labels()
            .iter()
            .filter_map(|label| {
                Some(DetectedLabel {
                    name: label.name()?.to_string(),
                    confidence: label.confidence().unwrap_or(0.0),
                })
            })
            .collect();

        tracing::debug!(
            file_key = %blob.key,
            label_count = labels.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Rekognition image labels detected"
        );

        Ok(labels)
    }

    async fn start_video_label_job(&self, blob: &BlobRef, min_confidence: f32) -> Result<String> {
        let location = blob.require_location()?;
        let video = Video::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&location.bucket)
                    .name(&location.key)
                    .build(),
            )
            .build();

        let response = self
            .client
            .start_label_detection()
            .video(video)
            .min_confidence(min_confidence)
            .send()
            .await
            .context("Failed to start label detection")?;

        let job_id = response
            .job_id()
            .map(|s| s.to_string())
            .context("Label detection job id missing from response")?;

        tracing::info!(
            file_key = %blob.key,
            provider_job_id = %job_id,
            "Rekognition video label job started"
        );

        Ok(job_id)
    }

    async fn poll_video_label_job(
        &self,
        job_id: &str,
    ) -> Result<JobPoll<Vec<DetectedLabel>>, JobError> {
        let mut labels = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .get_label_detection()
                .job_id(job_id)
                .sort_by(LabelDetectionSortBy::Timestamp)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(classify_poll_error)?;

            match response.job_status() {
                Some(VideoJobStatus::Succeeded) => {}
                Some(VideoJobStatus::Failed) => {
                    let reason = response.status_message().unwrap_or("Unknown error");
                    return Ok(JobPoll::Failed(reason.to_string()));
                }
                _ => return Ok(JobPoll::InProgress),
            }

            labels.extend(response.labels().iter().filter_map(|detection| {
                let label = detection.label()?;
                Some(DetectedLabel {
                    name: label.name()?.to_string(),
                    confidence: label.confidence().unwrap_or(0.0),
                })
            }));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(JobPoll::Succeeded(labels))
    }
}
