//! One extractor per media class.

mod audio;
mod image;
mod pdf;
mod text;
mod unsupported;
mod video;

pub use audio::AudioExtractor;
pub use image::ImageExtractor;
pub use pdf::PdfExtractor;
pub use text::{text_tags, PlainTextExtractor};
pub use unsupported::UnsupportedExtractor;
pub use video::VideoExtractor;

#[cfg(test)]
pub(crate) mod testing {
    use crate::strategy::{Capabilities, ExtractionInput};
    use mediatag_core::ExtractionConfig;
    use mediatag_plugins::test_helpers::{
        FakeKeyPhraseExtractor, FakeLabelDetector, FakeOcrEngine, FakeTranscriber,
    };
    use mediatag_plugins::BlobRef;
    use mediatag_storage::ObjectLocation;
    use std::sync::Arc;

    pub struct Fakes {
        pub labels: Arc<FakeLabelDetector>,
        pub key_phrases: Arc<FakeKeyPhraseExtractor>,
        pub transcriber: Arc<FakeTranscriber>,
        pub ocr: Arc<FakeOcrEngine>,
    }

    impl Fakes {
        pub fn new(ocr_text: &str) -> Self {
            Self {
                labels: Arc::new(FakeLabelDetector::new()),
                key_phrases: Arc::new(FakeKeyPhraseExtractor::new()),
                transcriber: Arc::new(FakeTranscriber::new()),
                ocr: Arc::new(FakeOcrEngine::with_text(ocr_text)),
            }
        }

        pub fn capabilities(&self) -> Capabilities {
            Capabilities {
                labels: self.labels.clone(),
                key_phrases: self.key_phrases.clone(),
                transcriber: self.transcriber.clone(),
                ocr: self.ocr.clone(),
                config: ExtractionConfig::default(),
            }
        }
    }

    pub fn input(name: &str, bytes: &[u8]) -> ExtractionInput {
        let key = format!("1700000000_abc_{}", name);
        let location = ObjectLocation {
            bucket: "media".to_string(),
            key: key.clone(),
        };
        ExtractionInput {
            file_key: key.clone(),
            original_name: name.to_string(),
            extension: crate::extension_of(name),
            blob: BlobRef::new(key, Some(location)).with_bytes(bytes.to_vec()),
        }
    }
}
