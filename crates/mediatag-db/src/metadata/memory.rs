use anyhow::Result;
use async_trait::async_trait;
use mediatag_core::{JobKind, MediaRecord, RecordPatch};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::MetadataStore;

/// Process-local metadata store. A single lock guards every write, which is
/// what makes `complete_part` atomic here.
#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    records: Arc<RwLock<HashMap<String, MediaRecord>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn put(&self, record: &MediaRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.file_key.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, file_key: &str) -> Result<Option<MediaRecord>> {
        Ok(self.records.read().await.get(file_key).cloned())
    }

    async fn update_fields(&self, file_key: &str, patch: &RecordPatch) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(file_key) {
            Some(record) => {
                patch.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_part(
        &self,
        file_key: &str,
        part: JobKind,
        patch: &RecordPatch,
    ) -> Result<Option<MediaRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(file_key) else {
            return Ok(None);
        };

        let patch = RecordPatch {
            pending_jobs: None,
            ..patch.clone()
        };
        patch.apply(record);
        record.pending_jobs.retain(|kind| *kind != part);

        Ok(Some(record.clone()))
    }

    async fn scan(&self) -> Result<Vec<MediaRecord>> {
        let mut records: Vec<MediaRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.file_key.cmp(&a.file_key))
        });
        Ok(records)
    }

    async fn delete(&self, file_key: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(file_key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatag_core::MediaClass;

    fn video(key: &str) -> MediaRecord {
        let mut r = MediaRecord::new(key, "clip.mp4", MediaClass::Video, "video/mp4", 10);
        r.pending_jobs = vec![JobKind::Transcription, JobKind::VideoLabels];
        r
    }

    #[tokio::test]
    async fn test_update_missing_record_is_noop() {
        let store = MemoryMetadataStore::new();
        let patch = RecordPatch {
            tags: Some(vec!["x".to_string()]),
            ..Default::default()
        };
        assert!(!store.update_fields("missing", &patch).await.unwrap());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_part_removes_only_that_part() {
        let store = MemoryMetadataStore::new();
        store.put(&video("k")).await.unwrap();

        let patch = RecordPatch {
            visual_labels: Some(vec!["Dog".to_string()]),
            ..Default::default()
        };
        let after = store
            .complete_part("k", JobKind::VideoLabels, &patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(after.pending_jobs, vec![JobKind::Transcription]);
        assert_eq!(after.visual_labels, vec!["Dog".to_string()]);
        assert!(after.tags.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_parts_exactly_one_sees_empty() {
        let store = MemoryMetadataStore::new();
        store.put(&video("k")).await.unwrap();

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .complete_part("k", JobKind::Transcription, &RecordPatch::default())
                    .await
                    .unwrap()
                    .unwrap()
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .complete_part("k", JobKind::VideoLabels, &RecordPatch::default())
                    .await
                    .unwrap()
                    .unwrap()
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let emptied = [a, b].iter().filter(|r| r.pending_jobs.is_empty()).count();
        assert_eq!(emptied, 1);
    }

    #[tokio::test]
    async fn test_scan_is_newest_first() {
        let store = MemoryMetadataStore::new();
        let mut old = MediaRecord::new("1_a_old.txt", "old.txt", MediaClass::PlainText, "text/plain", 1);
        old.created_at -= chrono::Duration::seconds(60);
        let new = MediaRecord::new("2_a_new.txt", "new.txt", MediaClass::PlainText, "text/plain", 1);
        store.put(&old).await.unwrap();
        store.put(&new).await.unwrap();

        let keys: Vec<String> = store
            .scan()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_key)
            .collect();
        assert_eq!(keys, vec!["2_a_new.txt".to_string(), "1_a_old.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_default_keyword_search_uses_scan() {
        let store = MemoryMetadataStore::new();
        let mut r = MediaRecord::new("1_a_cat.png", "cat.png", MediaClass::Image, "image/png", 1);
        r.tags = vec!["Whiskers".to_string()];
        store.put(&r).await.unwrap();

        assert_eq!(store.keyword_search("whisk").await.unwrap().len(), 1);
        assert!(store.keyword_search("dog").await.unwrap().is_empty());
    }
}
