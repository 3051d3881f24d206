use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::MediaClass;

use crate::fusion::rank_phrases;
use crate::strategy::{Capabilities, ExtractionInput, ExtractionOutcome, TagExtractor};

/// Key-phrase tags for `text`; provider failures yield no tags.
///
/// Shared by the text, PDF and transcription paths.
pub async fn text_tags(caps: &Capabilities, text: &str) -> Vec<String> {
    let cfg = &caps.config;
    match caps
        .key_phrases
        .extract_key_phrases(text, cfg.key_phrase_max_bytes)
        .await
    {
        Ok(phrases) => rank_phrases(&phrases, cfg.key_phrase_min_score, cfg.text_top_n),
        Err(e) => {
            tracing::warn!(error = %e, "Key phrase extraction failed");
            Vec::new()
        }
    }
}

/// Whole blob as transcript, key phrases as tags.
pub struct PlainTextExtractor {
    caps: Capabilities,
}

impl PlainTextExtractor {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }
}

#[async_trait]
impl TagExtractor for PlainTextExtractor {
    fn media_class(&self) -> MediaClass {
        MediaClass::PlainText
    }

    #[tracing::instrument(skip(self, input), fields(file_key = %input.file_key))]
    async fn extract(&self, input: &ExtractionInput) -> Result<ExtractionOutcome> {
        let bytes = input
            .blob
            .bytes
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Text blob {} was not loaded", input.file_key))?;
        let text = String::from_utf8_lossy(bytes).into_owned();

        let tags = if text.trim().is_empty() {
            Vec::new()
        } else {
            text_tags(&self.caps, &text).await
        };

        Ok(ExtractionOutcome::Immediate {
            tags,
            transcript: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::{input, Fakes};

    #[tokio::test]
    async fn test_text_becomes_transcript_and_tags() {
        let fakes = Fakes::new("");
        let extractor = PlainTextExtractor::new(fakes.capabilities());
        let body = "Quarterly revenue grew while marketing spend fell";

        let outcome = extractor.extract(&input("notes.txt", body.as_bytes())).await.unwrap();

        match outcome {
            ExtractionOutcome::Immediate { tags, transcript } => {
                assert_eq!(transcript, body);
                assert_eq!(tags[0], "Quarterly");
                assert!(tags.len() <= 8);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_caps_at_eight_tags() {
        let fakes = Fakes::new("");
        let extractor = PlainTextExtractor::new(fakes.capabilities());
        let body = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima";

        let outcome = extractor.extract(&input("words.txt", body.as_bytes())).await.unwrap();
        assert_eq!(outcome.tags().len(), 8);
    }

    #[tokio::test]
    async fn test_input_truncated_to_provider_limit() {
        let fakes = Fakes::new("");
        let extractor = PlainTextExtractor::new(fakes.capabilities());
        let body = "word ".repeat(2000);

        extractor.extract(&input("long.txt", body.as_bytes())).await.unwrap();
        assert_eq!(fakes.key_phrases.calls()[0].len(), 4500);
    }

    #[tokio::test]
    async fn test_key_phrase_failure_keeps_transcript() {
        let fakes = Fakes::new("");
        fakes.key_phrases.fail();
        let extractor = PlainTextExtractor::new(fakes.capabilities());

        let outcome = extractor.extract(&input("a.txt", b"some content here")).await.unwrap();
        assert_eq!(
            outcome,
            ExtractionOutcome::Immediate {
                tags: vec![],
                transcript: "some content here".into(),
            }
        );
    }
}
