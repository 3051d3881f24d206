//! Tag extraction for uploaded media.
//!
//! Uploads are classified by extension ([`classify`]) and handed to the
//! [`TagExtractor`] registered for their media class in an
//! [`ExtractorRegistry`]. Image, text and PDF extractors answer inline; audio
//! and video extractors start provider jobs and return them for the job
//! monitor to follow. [`fusion`] merges tag sources into the bounded list
//! stored on a record.

pub mod classify;
pub mod fusion;
pub mod registry;
pub mod strategies;
pub mod strategy;

pub use classify::{content_type_for, extension_of, media_format_for_extension};
pub use fusion::{dedupe, fuse, rank_labels, rank_phrases};
pub use registry::ExtractorRegistry;
pub use strategy::{
    Capabilities, ExtractionInput, ExtractionOutcome, StartedJob, TagExtractor,
};
