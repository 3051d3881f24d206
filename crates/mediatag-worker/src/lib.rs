//! Background job monitor.
//!
//! Provider jobs started by the audio and video extractors are persisted as
//! [`ExtractionJob`](mediatag_core::ExtractionJob) rows. [`JobMonitor`] runs a
//! bounded worker pool that claims due jobs, polls the provider, and applies
//! finished results to the media record through
//! [`MetadataStore::complete_part`](mediatag_db::MetadataStore::complete_part).

pub mod completion;
pub mod context;
pub mod monitor;

pub use context::JobHandlerContext;
pub use monitor::{poll_job, run_due_jobs, JobMonitor};
