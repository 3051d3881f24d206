//! In-memory capability fakes for tests.
//!
//! Each fake records how it was called so tests can assert on provider
//! traffic (for example that an unsupported upload made no calls at all).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mediatag_core::JobError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::capabilities::{
    BlobRef, DetectedLabel, DocumentType, JobPoll, KeyPhrase, KeyPhraseExtractor, LabelDetector,
    OcrEngine, TextCompleter, Transcriber,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn label(name: &str, confidence: f32) -> DetectedLabel {
    DetectedLabel {
        name: name.to_string(),
        confidence,
    }
}

/// Scripted poll outcome shared by every job a fake hands out.
#[derive(Debug, Clone)]
pub enum FakePoll<T> {
    Poll(JobPoll<T>),
    RecoverableError(String),
    UnrecoverableError(String),
}

impl<T: Clone> FakePoll<T> {
    fn resolve(&self) -> Result<JobPoll<T>, JobError> {
        match self {
            FakePoll::Poll(p) => Ok(p.clone()),
            FakePoll::RecoverableError(msg) => Err(JobError::recoverable(anyhow!(msg.clone()))),
            FakePoll::UnrecoverableError(msg) => {
                Err(JobError::unrecoverable(anyhow!(msg.clone())))
            }
        }
    }
}

#[derive(Debug)]
pub struct FakeLabelDetector {
    image_labels: Mutex<Vec<DetectedLabel>>,
    video_poll: Mutex<FakePoll<Vec<DetectedLabel>>>,
    fail_image: Mutex<bool>,
    fail_start: Mutex<bool>,
    image_calls: AtomicUsize,
    video_starts: AtomicUsize,
    video_polls: AtomicUsize,
}

impl Default for FakeLabelDetector {
    fn default() -> Self {
        Self {
            image_labels: Mutex::new(Vec::new()),
            video_poll: Mutex::new(FakePoll::Poll(JobPoll::InProgress)),
            fail_image: Mutex::new(false),
            fail_start: Mutex::new(false),
            image_calls: AtomicUsize::new(0),
            video_starts: AtomicUsize::new(0),
            video_polls: AtomicUsize::new(0),
        }
    }
}

impl FakeLabelDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_labels(labels: Vec<DetectedLabel>) -> Self {
        let fake = Self::default();
        fake.set_image_labels(labels);
        fake
    }

    pub fn set_image_labels(&self, labels: Vec<DetectedLabel>) {
        *lock(&self.image_labels) = labels;
    }

    pub fn set_video_poll(&self, poll: FakePoll<Vec<DetectedLabel>>) {
        *lock(&self.video_poll) = poll;
    }

    pub fn fail_image_detection(&self) {
        *lock(&self.fail_image) = true;
    }

    pub fn fail_video_start(&self) {
        *lock(&self.fail_start) = true;
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn video_starts(&self) -> usize {
        self.video_starts.load(Ordering::SeqCst)
    }

    pub fn video_polls(&self) -> usize {
        self.video_polls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.image_calls() + self.video_starts() + self.video_polls()
    }
}

#[async_trait]
impl LabelDetector for FakeLabelDetector {
    async fn detect_image_labels(
        &self,
        _blob: &BlobRef,
        max_labels: i32,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if *lock(&self.fail_image) {
            return Err(anyhow!("label detection unavailable"));
        }
        Ok(lock(&self.image_labels)
            .iter()
            .filter(|l| l.confidence >= min_confidence)
            .take(max_labels.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn start_video_label_job(&self, _blob: &BlobRef, _min_confidence: f32) -> Result<String> {
        let n = self.video_starts.fetch_add(1, Ordering::SeqCst);
        if *lock(&self.fail_start) {
            return Err(anyhow!("video label detection unavailable"));
        }
        Ok(format!("video-job-{}", n + 1))
    }

    async fn poll_video_label_job(
        &self,
        _job_id: &str,
    ) -> Result<JobPoll<Vec<DetectedLabel>>, JobError> {
        self.video_polls.fetch_add(1, Ordering::SeqCst);
        lock(&self.video_poll).resolve()
    }
}

/// Treats every distinct word of four or more letters as a phrase, scored
/// from 0.99 downwards in order of appearance.
#[derive(Debug, Default)]
pub struct FakeKeyPhraseExtractor {
    calls: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl FakeKeyPhraseExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        *lock(&self.fail) = true;
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl KeyPhraseExtractor for FakeKeyPhraseExtractor {
    async fn extract_key_phrases(&self, text: &str, max_bytes: usize) -> Result<Vec<KeyPhrase>> {
        let input = crate::truncate_utf8(text, max_bytes);
        lock(&self.calls).push(input.to_string());
        if *lock(&self.fail) {
            return Err(anyhow!("key phrase extraction unavailable"));
        }

        let mut seen: Vec<String> = Vec::new();
        for word in input.split(|c: char| !c.is_alphanumeric()) {
            if word.chars().count() >= 4 && !seen.iter().any(|s| s.eq_ignore_ascii_case(word)) {
                seen.push(word.to_string());
            }
        }
        Ok(seen
            .into_iter()
            .enumerate()
            .map(|(i, text)| KeyPhrase {
                text,
                score: (0.99 - i as f32 * 0.01).max(0.0),
            })
            .collect())
    }
}

#[derive(Debug)]
pub struct FakeTranscriber {
    poll: Mutex<FakePoll<String>>,
    transcript: Mutex<String>,
    fail_start: Mutex<bool>,
    starts: Mutex<Vec<(String, String, String)>>,
    polls: AtomicUsize,
}

impl Default for FakeTranscriber {
    fn default() -> Self {
        Self {
            poll: Mutex::new(FakePoll::Poll(JobPoll::InProgress)),
            transcript: Mutex::new(String::new()),
            fail_start: Mutex::new(false),
            starts: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent poll reports success with `transcript`.
    pub fn complete_with(&self, transcript: &str) {
        *lock(&self.transcript) = transcript.to_string();
        *lock(&self.poll) = FakePoll::Poll(JobPoll::Succeeded("memory://transcript.json".into()));
    }

    pub fn set_poll(&self, poll: FakePoll<String>) {
        *lock(&self.poll) = poll;
    }

    pub fn fail_start(&self) {
        *lock(&self.fail_start) = true;
    }

    /// `(blob key, media format, language)` per started job.
    pub fn starts(&self) -> Vec<(String, String, String)> {
        lock(&self.starts).clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn start_job(
        &self,
        blob: &BlobRef,
        media_format: &str,
        language: &str,
    ) -> Result<String> {
        if *lock(&self.fail_start) {
            return Err(anyhow!("transcription unavailable"));
        }
        let mut starts = lock(&self.starts);
        starts.push((
            blob.key.clone(),
            media_format.to_string(),
            language.to_string(),
        ));
        Ok(format!("transcribe-job-{}", starts.len()))
    }

    async fn poll_job(&self, _job_id: &str) -> Result<JobPoll<String>, JobError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        lock(&self.poll).resolve()
    }

    async fn fetch_transcript(&self, _transcript_uri: &str) -> Result<String> {
        Ok(lock(&self.transcript).clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeOcrEngine {
    text: Mutex<String>,
    calls: Mutex<Vec<DocumentType>>,
}

impl FakeOcrEngine {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<DocumentType> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl OcrEngine for FakeOcrEngine {
    async fn extract_text(&self, _blob: &BlobRef, doc_type: DocumentType) -> Result<String> {
        lock(&self.calls).push(doc_type);
        Ok(lock(&self.text).clone())
    }
}

/// Replies are consumed in order; once exhausted the default reply is used.
#[derive(Debug)]
pub struct FakeCompleter {
    replies: Mutex<VecDeque<Result<String, String>>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl Default for FakeCompleter {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: "NO_MATCHES".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl FakeCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fake = Self::default();
        for reply in replies {
            fake.push_reply(reply);
        }
        fake
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.replies).push_back(Err(message.into()));
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl TextCompleter for FakeCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        lock(&self.prompts).push(prompt.to_string());
        match lock(&self.replies).pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(self.default_reply.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_key_phrases_skip_short_and_repeated_words() {
        let fake = FakeKeyPhraseExtractor::new();
        let phrases = fake
            .extract_key_phrases("the quick brown fox jumps over the Quick dog", 4500)
            .await
            .unwrap();
        let texts: Vec<&str> = phrases.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["quick", "brown", "jumps", "over"]);
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fake_completer_falls_back_to_default() {
        let fake = FakeCompleter::with_replies(["1"]);
        assert_eq!(fake.complete("a").await.unwrap(), "1");
        assert_eq!(fake.complete("b").await.unwrap(), "NO_MATCHES");
        assert_eq!(fake.prompts(), vec!["a", "b"]);
    }
}
