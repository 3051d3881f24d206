//! AWS Transcribe speech-to-text jobs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_transcribe::error::SdkError;
use aws_sdk_transcribe::operation::get_transcription_job::GetTranscriptionJobError;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use mediatag_core::{JobError, JobResultExt};
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;
use uuid::Uuid;

use crate::capabilities::{BlobRef, JobPoll, Transcriber};

pub struct AwsTranscriber {
    client: TranscribeClient,
    http: reqwest::Client,
}

impl Debug for AwsTranscriber {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AwsTranscriber").finish()
    }
}

impl AwsTranscriber {
    pub fn new(config: &aws_config::SdkConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client: TranscribeClient::new(config),
            http,
        })
    }
}

fn classify_poll_error(err: SdkError<GetTranscriptionJobError>) -> JobError {
    let permanent = err
        .as_service_error()
        .map(|e| e.is_not_found_exception() || e.is_bad_request_exception())
        .unwrap_or(false);
    let err = anyhow::Error::new(err).context("Failed to get transcription job status");
    if permanent {
        JobError::unrecoverable(err)
    } else {
        JobError::recoverable(err)
    }
}

#[async_trait]
impl Transcriber for AwsTranscriber {
    async fn start_job(
        &self,
        blob: &BlobRef,
        media_format: &str,
        language: &str,
    ) -> Result<String> {
        let location = blob.require_location()?;
        let job_name = format!("mediatag-{}", Uuid::new_v4().simple());
        let media = Media::builder().media_file_uri(location.s3_uri()).build();

        self.client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media(media)
            .media_format(MediaFormat::from(media_format))
            .language_code(LanguageCode::from(language))
            .send()
            .await
            .context("Failed to start transcription job")?;

        tracing::info!(
            file_key = %blob.key,
            transcription_job_name = %job_name,
            media_format = %media_format,
            "Transcription job started"
        );

        Ok(job_name)
    }

    async fn poll_job(&self, job_id: &str) -> Result<JobPoll<String>, JobError> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_id)
            .send()
            .await
            .map_err(classify_poll_error)?;

        let job = response
            .transcription_job()
            .context("Transcription job not found in response")
            .unrecoverable()?;

        let status = job
            .transcription_job_status()
            .map(|s| s.as_str())
            .unwrap_or("UNKNOWN");

        match status {
            "COMPLETED" => {
                let uri = job
                    .transcript()
                    .and_then(|t| t.transcript_file_uri())
                    .map(|s| s.to_string())
                    .context("Transcript URI not found")
                    .unrecoverable()?;
                Ok(JobPoll::Succeeded(uri))
            }
            "FAILED" => Ok(JobPoll::Failed(
                job.failure_reason().unwrap_or("Unknown error").to_string(),
            )),
            // QUEUED or IN_PROGRESS
            _ => Ok(JobPoll::InProgress),
        }
    }

    async fn fetch_transcript(&self, transcript_uri: &str) -> Result<String> {
        let response = self
            .http
            .get(transcript_uri)
            .send()
            .await
            .context("Failed to download transcript")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to download transcript: HTTP {}",
                response.status()
            ));
        }

        let parsed: TranscriptionResult = response
            .json()
            .await
            .context("Failed to parse transcript JSON")?;

        Ok(parsed.into_text())
    }
}

// Transcript document layout
#[derive(Debug, Deserialize)]
struct TranscriptionResult {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<Transcript>,
}

#[derive(Debug, Deserialize)]
struct Transcript {
    transcript: Option<String>,
}

impl TranscriptionResult {
    fn into_text(self) -> String {
        self.results
            .transcripts
            .into_iter()
            .filter_map(|t| t.transcript)
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_text_from_document() {
        let doc = r#"{
            "jobName": "mediatag-1",
            "results": {
                "transcripts": [{"transcript": "the quick brown fox jumps"}],
                "items": []
            },
            "status": "COMPLETED"
        }"#;
        let parsed: TranscriptionResult = serde_json::from_str(doc).unwrap();
        assert_eq!(parsed.into_text(), "the quick brown fox jumps");
    }

    #[test]
    fn test_empty_transcript_document() {
        let doc = r#"{"results": {"transcripts": []}}"#;
        let parsed: TranscriptionResult = serde_json::from_str(doc).unwrap();
        assert_eq!(parsed.into_text(), "");
    }
}
