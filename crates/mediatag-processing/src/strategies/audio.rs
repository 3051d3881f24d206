use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::{JobKind, MediaClass};

use crate::classify::media_format_for_extension;
use crate::strategy::{Capabilities, ExtractionInput, ExtractionOutcome, StartedJob, TagExtractor};

/// Start a transcription job for `input`, or `None` if it could not start.
pub(crate) async fn start_transcription(
    caps: &Capabilities,
    input: &ExtractionInput,
) -> Option<StartedJob> {
    let Some(format) = media_format_for_extension(&input.extension) else {
        tracing::warn!(extension = %input.extension, "No transcription format for extension");
        return None;
    };

    match caps
        .transcriber
        .start_job(&input.blob, format, &caps.config.transcribe_language_code)
        .await
    {
        Ok(provider_job_id) => Some(StartedJob {
            kind: JobKind::Transcription,
            provider_job_id,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to start transcription job");
            None
        }
    }
}

/// Defers to a transcription job.
pub struct AudioExtractor {
    caps: Capabilities,
}

impl AudioExtractor {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }
}

#[async_trait]
impl TagExtractor for AudioExtractor {
    fn media_class(&self) -> MediaClass {
        MediaClass::Audio
    }

    #[tracing::instrument(skip(self, input), fields(file_key = %input.file_key))]
    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome> {
        Ok(match start_transcription(&self.caps, input).await {
            Some(job) => ExtractionOutcome::Deferred { jobs: vec![job] },
            None => ExtractionOutcome::empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::{input, Fakes};

    #[tokio::test]
    async fn test_starts_transcription_job() {
        let fakes = Fakes::new("");
        let extractor = AudioExtractor::new(fakes.capabilities());

        let outcome = extractor.extract(&input("voice.m4a", b"audio")).await.unwrap();

        assert_eq!(
            outcome,
            ExtractionOutcome::Deferred {
                jobs: vec![StartedJob {
                    kind: JobKind::Transcription,
                    provider_job_id: "transcribe-job-1".into(),
                }]
            }
        );
        let starts = fakes.transcriber.starts();
        assert_eq!(starts[0].1, "mp4");
        assert_eq!(starts[0].2, "en-US");
    }

    #[tokio::test]
    async fn test_start_failure_degrades_to_empty() {
        let fakes = Fakes::new("");
        fakes.transcriber.fail_start();
        let extractor = AudioExtractor::new(fakes.capabilities());

        let outcome = extractor.extract(&input("voice.mp3", b"audio")).await.unwrap();
        assert_eq!(outcome, ExtractionOutcome::empty());
    }
}
