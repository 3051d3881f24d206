use anyhow::{Context, Result};
use async_trait::async_trait;
use mediatag_core::{JobKind, MediaRecord, RecordPatch};
use sqlx::{PgPool, Postgres};

use super::MetadataStore;

const RECORD_COLUMNS: &str = r#"
    file_key,
    original_name,
    media_class,
    content_type,
    size_bytes,
    tags,
    transcript,
    visual_labels,
    transcript_tags,
    pending_jobs,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn kinds_to_text(kinds: &[JobKind]) -> Vec<String> {
    kinds.iter().map(|k| k.to_string()).collect()
}

/// Escape LIKE wildcards so the query is matched literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    #[tracing::instrument(skip(self, record), fields(file_key = %record.file_key))]
    async fn put(&self, record: &MediaRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media_records (
                file_key, original_name, media_class, content_type, size_bytes,
                tags, transcript, visual_labels, transcript_tags, pending_jobs,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (file_key) DO UPDATE SET
                original_name = EXCLUDED.original_name,
                media_class = EXCLUDED.media_class,
                content_type = EXCLUDED.content_type,
                size_bytes = EXCLUDED.size_bytes,
                tags = EXCLUDED.tags,
                transcript = EXCLUDED.transcript,
                visual_labels = EXCLUDED.visual_labels,
                transcript_tags = EXCLUDED.transcript_tags,
                pending_jobs = EXCLUDED.pending_jobs,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.file_key)
        .bind(&record.original_name)
        .bind(record.media_class.to_string())
        .bind(&record.content_type)
        .bind(record.size_bytes)
        .bind(&record.tags)
        .bind(&record.transcript)
        .bind(&record.visual_labels)
        .bind(&record.transcript_tags)
        .bind(kinds_to_text(&record.pending_jobs))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert media record")?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, file_key: &str) -> Result<Option<MediaRecord>> {
        let sql = format!("SELECT {} FROM media_records WHERE file_key = $1", RECORD_COLUMNS);
        let record = sqlx::query_as::<Postgres, MediaRecord>(&sql)
            .bind(file_key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch media record")?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_fields(&self, file_key: &str, patch: &RecordPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(self.get(file_key).await?.is_some());
        }

        let result = sqlx::query(
            r#"
            UPDATE media_records
            SET tags = COALESCE($2, tags),
                transcript = COALESCE($3, transcript),
                visual_labels = COALESCE($4, visual_labels),
                transcript_tags = COALESCE($5, transcript_tags),
                pending_jobs = COALESCE($6, pending_jobs),
                updated_at = NOW()
            WHERE file_key = $1
            "#,
        )
        .bind(file_key)
        .bind(patch.tags.as_ref())
        .bind(patch.transcript.as_ref())
        .bind(patch.visual_labels.as_ref())
        .bind(patch.transcript_tags.as_ref())
        .bind(patch.pending_jobs.as_deref().map(kinds_to_text))
        .execute(&self.pool)
        .await
        .context("Failed to update media record")?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, patch))]
    async fn complete_part(
        &self,
        file_key: &str,
        part: JobKind,
        patch: &RecordPatch,
    ) -> Result<Option<MediaRecord>> {
        // Row lock on UPDATE serialises concurrent completions; array_remove
        // sees the sibling's committed removal.
        let sql = format!(
            r#"
            UPDATE media_records
            SET tags = COALESCE($2, tags),
                transcript = COALESCE($3, transcript),
                visual_labels = COALESCE($4, visual_labels),
                transcript_tags = COALESCE($5, transcript_tags),
                pending_jobs = array_remove(pending_jobs, $6),
                updated_at = NOW()
            WHERE file_key = $1
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );

        let record = sqlx::query_as::<Postgres, MediaRecord>(&sql)
            .bind(file_key)
            .bind(patch.tags.as_ref())
            .bind(patch.transcript.as_ref())
            .bind(patch.visual_labels.as_ref())
            .bind(patch.transcript_tags.as_ref())
            .bind(part.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to complete media record part")?;

        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn scan(&self) -> Result<Vec<MediaRecord>> {
        let sql = format!(
            "SELECT {} FROM media_records ORDER BY created_at DESC, file_key DESC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<Postgres, MediaRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to scan media records")?;

        Ok(records)
    }

    #[tracing::instrument(skip(self))]
    async fn keyword_search(&self, query: &str) -> Result<Vec<MediaRecord>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {}
            FROM media_records
            WHERE original_name ILIKE $1
               OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1)
            ORDER BY created_at DESC, file_key DESC
            "#,
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<Postgres, MediaRecord>(&sql)
            .bind(like_pattern(query))
            .fetch_all(&self.pool)
            .await
            .context("Failed to search media records")?;

        Ok(records)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, file_key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_records WHERE file_key = $1")
            .bind(file_key)
            .execute(&self.pool)
            .await
            .context("Failed to delete media record")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" cat "), "%cat%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
