//! Mediatag Core Library
//!
//! Domain models, error types and configuration shared by every mediatag crate.

pub mod config;
pub mod error;
pub mod job_error;
pub mod models;
pub mod storage_types;

pub use config::{Config, ExtractionConfig, JobMonitorConfig, KeyPhraseProvider};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use job_error::{JobError, JobResultExt};
pub use models::*;
pub use storage_types::StorageBackend;
