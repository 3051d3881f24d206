//! Anthropic Claude text completion.
//!
//! [`ClaudeClient`] drives the natural-language search passes.
//! [`ClaudeKeyPhraseExtractor`] is the LLM-backed alternative to Comprehend:
//! it asks for a comma separated tag list and scores tags by their position.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::capabilities::{truncate_utf8, KeyPhrase, KeyPhraseExtractor, TextCompleter};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Clone)]
pub struct ClaudeClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ClaudeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// Messages API request/response
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockResponse {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, model, ANTHROPIC_API_BASE)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url)
    }
}

#[async_trait]
impl TextCompleter for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![ContentBlock::Text {
                    text: prompt.to_string(),
                }],
            }],
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send Messages API request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Anthropic Messages API failed with status {}: {}",
                status,
                error_text
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Messages API response")?;

        let text = parsed
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Claude completion finished"
        );

        Ok(text)
    }
}

/// Key phrases via a completion model.
pub struct ClaudeKeyPhraseExtractor {
    completer: Arc<dyn TextCompleter>,
    max_tags: usize,
}

impl ClaudeKeyPhraseExtractor {
    pub fn new(completer: Arc<dyn TextCompleter>, max_tags: usize) -> Self {
        Self {
            completer,
            max_tags,
        }
    }

    fn prompt(&self, text: &str) -> String {
        format!(
            "Extract up to {} short descriptive tags (one to three words each) that best \
             summarise the following text. Reply with the tags only, separated by commas, \
             most important first.\n\nText:\n{}",
            self.max_tags, text
        )
    }
}

/// Split a comma separated reply into tags; earlier tags score higher.
pub fn parse_tag_list(reply: &str) -> Vec<KeyPhrase> {
    reply
        .split([',', '\n'])
        .map(|t| t.trim().trim_matches(|c| c == '"' || c == '.' || c == '-' || c == '*').trim())
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(i, t)| KeyPhrase {
            text: t.to_string(),
            score: (1.0 - i as f32 * 0.01).max(0.0),
        })
        .collect()
}

#[async_trait]
impl KeyPhraseExtractor for ClaudeKeyPhraseExtractor {
    async fn extract_key_phrases(&self, text: &str, max_bytes: usize) -> Result<Vec<KeyPhrase>> {
        let input = truncate_utf8(text, max_bytes);
        if input.trim().is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.completer.complete(&self.prompt(input)).await?;
        let mut phrases = parse_tag_list(&reply);
        phrases.truncate(self.max_tags);
        Ok(phrases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list_scores_by_position() {
        let tags = parse_tag_list("Cooking, \"Italian food\", pasta.\n");
        let names: Vec<&str> = tags.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(names, vec!["Cooking", "Italian food", "pasta"]);
        assert!(tags[0].score > tags[1].score);
        assert!(tags[2].score >= 0.8);
    }

    #[test]
    fn test_parse_tag_list_empty_reply() {
        assert!(parse_tag_list("  ,  \n").is_empty());
    }

    #[tokio::test]
    async fn test_complete_sends_messages_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"1, 3"}]}"#)
            .create_async()
            .await;

        let client = ClaudeClient::with_base_url("test-key", "claude-test", server.url()).unwrap();
        let reply = client.complete("which files?").await.unwrap();

        assert_eq!(reply, "1, 3");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(529)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#)
            .create_async()
            .await;

        let client = ClaudeClient::with_base_url("test-key", "claude-test", server.url()).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(err.to_string().contains("529"));
    }

    #[tokio::test]
    async fn test_key_phrase_extractor_caps_tags() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"a, b, c, d"}]}"#)
            .create_async()
            .await;

        let client = ClaudeClient::with_base_url("k", "m", server.url()).unwrap();
        let extractor = ClaudeKeyPhraseExtractor::new(Arc::new(client), 2);
        let phrases = extractor.extract_key_phrases("some text", 100).await.unwrap();
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].text, "a");
    }
}
