//! AWS Comprehend key-phrase extraction

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_comprehend::types::LanguageCode;
use aws_sdk_comprehend::Client as ComprehendClient;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::capabilities::{truncate_utf8, KeyPhrase, KeyPhraseExtractor};

pub struct AwsComprehendExtractor {
    client: ComprehendClient,
}

impl Debug for AwsComprehendExtractor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AwsComprehendExtractor").finish()
    }
}

impl AwsComprehendExtractor {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: ComprehendClient::new(config),
        }
    }
}

#[async_trait]
impl KeyPhraseExtractor for AwsComprehendExtractor {
    async fn extract_key_phrases(&self, text: &str, max_bytes: usize) -> Result<Vec<KeyPhrase>> {
        let input = truncate_utf8(text, max_bytes);
        if input.trim().is_empty() {
            return Ok(Vec::new());
        }

        let start = std::time::Instant::now();
        let response = self
            .client
            .detect_key_phrases()
            .text(input)
            .language_code(LanguageCode::En)
            .send()
            .await
            .context("Failed to detect key phrases")?;

        let phrases: Vec<KeyPhrase> = response
            .key_phrases()
            .iter()
            .filter_map(|p| {
                Some(KeyPhrase {
                    text: p.text()?.to_string(),
                    score: p.score().unwrap_or(0.0),
                })
            })
            .collect();

        tracing::debug!(
            input_bytes = input.len(),
            phrase_count = phrases.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Comprehend key phrases detected"
        );

        Ok(phrases)
    }
}
