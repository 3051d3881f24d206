//! Document store for media records, keyed by file key.

mod memory;
mod postgres;

pub use memory::MemoryMetadataStore;
pub use postgres::PgMetadataStore;

use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::{JobKind, MediaRecord, RecordPatch};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or replace a record
    async fn put(&self, record: &MediaRecord) -> Result<()>;

    async fn get(&self, file_key: &str) -> Result<Option<MediaRecord>>;

    /// Apply a partial update. Returns `false` when the record does not exist.
    async fn update_fields(&self, file_key: &str, patch: &RecordPatch) -> Result<bool>;

    /// Apply `patch` and remove `part` from `pending_jobs` in one atomic step,
    /// returning the record as it is after the update. `None` when the record
    /// no longer exists.
    ///
    /// Concurrent completions for the same record are serialised, so exactly
    /// one caller observes `pending_jobs` becoming empty.
    async fn complete_part(
        &self,
        file_key: &str,
        part: JobKind,
        patch: &RecordPatch,
    ) -> Result<Option<MediaRecord>>;

    /// Every record, newest first
    async fn scan(&self) -> Result<Vec<MediaRecord>>;

    /// Records whose name or tags contain `query` (case-insensitive).
    async fn keyword_search(&self, query: &str) -> Result<Vec<MediaRecord>> {
        let records = self.scan().await?;
        Ok(records
            .into_iter()
            .filter(|r| matches_keyword(r, query))
            .collect())
    }

    /// Returns `false` when there was nothing to delete
    async fn delete(&self, file_key: &str) -> Result<bool>;
}

/// Case-insensitive substring match over `original_name` and each tag.
pub fn matches_keyword(record: &MediaRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    record.original_name.to_lowercase().contains(&needle)
        || record
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}
