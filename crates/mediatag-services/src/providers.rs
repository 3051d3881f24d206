//! Provider wiring from configuration.

use anyhow::{Context, Result};
use mediatag_core::{Config, KeyPhraseProvider};
use mediatag_plugins::aws::load_sdk_config;
use mediatag_plugins::aws_comprehend::AwsComprehendExtractor;
use mediatag_plugins::aws_rekognition::AwsRekognitionDetector;
use mediatag_plugins::aws_textract::AwsTextractEngine;
use mediatag_plugins::aws_transcribe::AwsTranscriber;
use mediatag_plugins::claude::{ClaudeClient, ClaudeKeyPhraseExtractor};
use mediatag_plugins::{KeyPhraseExtractor, TextCompleter};
use mediatag_processing::Capabilities;
use std::sync::Arc;

/// Completion client for natural-language search, if an API key is set.
pub fn build_completer(config: &Config) -> Result<Option<Arc<dyn TextCompleter>>> {
    let Some(api_key) = config.anthropic_api_key() else {
        tracing::info!("ANTHROPIC_API_KEY not set, natural-language search disabled");
        return Ok(None);
    };
    let client = ClaudeClient::new(api_key, config.anthropic_model())
        .context("Failed to create Claude client")?;
    Ok(Some(Arc::new(client)))
}

/// AWS-backed extraction capabilities, with key phrases from Comprehend or
/// from the completion model depending on configuration.
pub async fn build_capabilities(
    config: &Config,
    completer: Option<Arc<dyn TextCompleter>>,
) -> Result<Capabilities> {
    let sdk_config = load_sdk_config(config.provider_region()).await;

    let key_phrases: Arc<dyn KeyPhraseExtractor> = match config.key_phrase_provider() {
        KeyPhraseProvider::Comprehend => Arc::new(AwsComprehendExtractor::new(&sdk_config)),
        KeyPhraseProvider::Claude => {
            let completer = completer.context(
                "KEY_PHRASE_PROVIDER=claude requires ANTHROPIC_API_KEY to be set",
            )?;
            Arc::new(ClaudeKeyPhraseExtractor::new(
                completer,
                config.extraction().text_top_n,
            ))
        }
    };

    tracing::info!(
        key_phrase_provider = %config.key_phrase_provider(),
        region = ?config.provider_region(),
        "Extraction providers configured"
    );

    Ok(Capabilities {
        labels: Arc::new(AwsRekognitionDetector::new(&sdk_config)),
        key_phrases,
        transcriber: Arc::new(AwsTranscriber::new(&sdk_config)?),
        ocr: Arc::new(AwsTextractEngine::new(&sdk_config)),
        config: config.extraction().clone(),
    })
}
