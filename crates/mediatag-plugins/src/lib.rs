//! Provider capabilities used by the tag extraction pipeline.
//!
//! Each external AI service is reached through a narrow trait
//! ([`LabelDetector`], [`KeyPhraseExtractor`], [`Transcriber`], [`OcrEngine`],
//! [`TextCompleter`]) so strategies and the job monitor never depend on a
//! specific vendor. AWS and Anthropic implementations are feature gated.

pub mod capabilities;

#[cfg(any(
    feature = "aws-rekognition",
    feature = "aws-transcribe",
    feature = "aws-comprehend",
    feature = "aws-textract"
))]
pub mod aws;
#[cfg(feature = "aws-comprehend")]
pub mod aws_comprehend;
#[cfg(feature = "aws-rekognition")]
pub mod aws_rekognition;
#[cfg(feature = "aws-textract")]
pub mod aws_textract;
#[cfg(feature = "aws-transcribe")]
pub mod aws_transcribe;
#[cfg(feature = "claude")]
pub mod claude;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use capabilities::{
    truncate_utf8, BlobRef, DetectedLabel, DocumentType, JobPoll, KeyPhrase, KeyPhraseExtractor,
    LabelDetector, OcrEngine, TextCompleter, Transcriber,
};
