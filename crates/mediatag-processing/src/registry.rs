//! Extension → media class → extractor table.

use anyhow::Result;
use mediatag_core::MediaClass;
use std::collections::HashMap;
use std::sync::Arc;

use crate::classify::extension_of;
use crate::strategies::{
    AudioExtractor, ImageExtractor, PdfExtractor, PlainTextExtractor, UnsupportedExtractor,
    VideoExtractor,
};
use crate::strategy::{Capabilities, ExtractionInput, ExtractionOutcome, TagExtractor};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "log", "json"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "amr"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

pub struct ExtractorRegistry {
    classes: HashMap<String, MediaClass>,
    extractors: HashMap<MediaClass, Arc<dyn TagExtractor>>,
    fallback: Arc<dyn TagExtractor>,
}

impl ExtractorRegistry {
    /// Empty table; every extension is unsupported until registered.
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
            extractors: HashMap::new(),
            fallback: Arc::new(UnsupportedExtractor),
        }
    }

    /// The default extension table wired to `caps`.
    pub fn new(caps: Capabilities) -> Self {
        let mut registry = Self::empty();
        registry.register_extensions(IMAGE_EXTENSIONS, MediaClass::Image);
        registry.register_extensions(TEXT_EXTENSIONS, MediaClass::PlainText);
        registry.register_extensions(&["pdf"], MediaClass::Pdf);
        registry.register_extensions(AUDIO_EXTENSIONS, MediaClass::Audio);
        registry.register_extensions(VIDEO_EXTENSIONS, MediaClass::Video);

        registry.register_extractor(Arc::new(ImageExtractor::new(caps.clone())));
        registry.register_extractor(Arc::new(PlainTextExtractor::new(caps.clone())));
        registry.register_extractor(Arc::new(PdfExtractor::new(caps.clone())));
        registry.register_extractor(Arc::new(AudioExtractor::new(caps.clone())));
        registry.register_extractor(Arc::new(VideoExtractor::new(caps)));
        registry
    }

    pub fn register_extensions(&mut self, extensions: &[&str], class: MediaClass) {
        for ext in extensions {
            self.classes.insert(ext.to_lowercase(), class);
        }
    }

    /// Replaces any extractor already registered for the same class.
    pub fn register_extractor(&mut self, extractor: Arc<dyn TagExtractor>) {
        self.extractors.insert(extractor.media_class(), extractor);
    }

    pub fn classify(&self, filename: &str) -> MediaClass {
        self.classes
            .get(&extension_of(filename))
            .copied()
            .unwrap_or(MediaClass::Unsupported)
    }

    pub fn extractor_for(&self, class: MediaClass) -> Arc<dyn TagExtractor> {
        self.extractors
            .get(&class)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Classify `input` and run the matching extractor.
    pub async fn extract(&self, input: &ExtractionInput) -> Result<(MediaClass, ExtractionOutcome)> {
        let class = self.classify(&input.original_name);
        let extractor = self.extractor_for(class);
        let start = std::time::Instant::now();
        let outcome = extractor.extract(input).await?;

        tracing::info!(
            file_key = %input.file_key,
            media_class = %class,
            tag_count = outcome.tags().len(),
            deferred = matches!(outcome, ExtractionOutcome::Deferred { .. }),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Tag extraction finished"
        );

        Ok((class, outcome))
    }
}
