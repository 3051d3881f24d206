//! Mediatag persistence
//!
//! `MetadataStore` keeps one `MediaRecord` per uploaded file; `JobStore` keeps
//! the provider jobs the background monitor is polling. Both come with a
//! Postgres implementation and an in-memory one used when no `DATABASE_URL`
//! is configured and in tests.

pub mod jobs;
pub mod metadata;

pub use jobs::{JobStore, MemoryJobStore, PgJobStore};
pub use metadata::{matches_keyword, MemoryMetadataStore, MetadataStore, PgMetadataStore};
