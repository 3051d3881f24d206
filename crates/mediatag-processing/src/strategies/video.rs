use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::{JobKind, MediaClass};

use super::audio::start_transcription;
use crate::strategy::{Capabilities, ExtractionInput, ExtractionOutcome, StartedJob, TagExtractor};

/// Starts a transcription job and a video label job side by side.
pub struct VideoExtractor {
    caps: Capabilities,
}

impl VideoExtractor {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    async fn start_labels(&self, input: &ExtractionInput) -> Option<StartedJob> {
        match self
            .caps
            .labels
            .start_video_label_job(&input.blob, self.caps.config.video_label_min_confidence)
            .await
        {
            Ok(provider_job_id) => Some(StartedJob {
                kind: JobKind::VideoLabels,
                provider_job_id,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start video label job");
                None
            }
        }
    }
}

#[async_trait]
impl TagExtractor for VideoExtractor {
    fn media_class(&self) -> MediaClass {
        MediaClass::Video
    }

    #[tracing::instrument(skip(self, input), fields(file_key = %input.file_key))]
    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome> {
        let (transcription, labels) =
            tokio::join!(start_transcription(&self.caps, input), self.start_labels(input));

        let jobs: Vec<StartedJob> = transcription.into_iter().chain(labels).collect();
        if jobs.is_empty() {
            return Ok(ExtractionOutcome::empty());
        }
        Ok(ExtractionOutcome::Deferred { jobs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::{input, Fakes};

    #[tokio::test]
    async fn test_starts_both_jobs() {
        let fakes = Fakes::new("");
        let extractor = VideoExtractor::new(fakes.capabilities());

        let outcome = extractor.extract(&input("clip.mp4", b"video")).await.unwrap();

        let ExtractionOutcome::Deferred { jobs } = outcome else {
            panic!("expected deferred outcome");
        };
        let kinds: Vec<JobKind> = jobs.iter().map(|j| j.kind).collect();
        assert_eq!(kinds, vec![JobKind::Transcription, JobKind::VideoLabels]);
        assert_eq!(fakes.labels.video_starts(), 1);
        assert_eq!(fakes.transcriber.starts().len(), 1);
    }

    #[tokio::test]
    async fn test_label_job_alone_when_transcription_fails() {
        let fakes = Fakes::new("");
        fakes.transcriber.fail_start();
        let extractor = VideoExtractor::new(fakes.capabilities());

        let outcome = extractor.extract(&input("clip.mp4", b"video")).await.unwrap();

        assert_eq!(
            outcome,
            ExtractionOutcome::Deferred {
                jobs: vec![StartedJob {
                    kind: JobKind::VideoLabels,
                    provider_job_id: "video-job-1".into(),
                }]
            }
        );
    }

    #[tokio::test]
    async fn test_both_failures_degrade_to_empty() {
        let fakes = Fakes::new("");
        fakes.transcriber.fail_start();
        fakes.labels.fail_video_start();
        let extractor = VideoExtractor::new(fakes.capabilities());

        let outcome = extractor.extract(&input("clip.mov", b"video")).await.unwrap();
        assert_eq!(outcome, ExtractionOutcome::empty());
    }
}
