//! Listing, lookup, transcript retrieval and deletion.

use chrono::{DateTime, Utc};
use mediatag_core::{AppError, MediaRecord, MediaResponse, TranscriptResponse};
use mediatag_processing::content_type_for;
use mediatag_storage::{display_name_from_key, validate_key};
use std::collections::HashSet;

use crate::context::ServiceContext;
use crate::error::{metadata_error, storage_error};

/// Every record with a fresh URL, newest first.
///
/// Blobs without a record (left behind by a failed metadata write) are
/// appended with their display name and no tags.
#[tracing::instrument(skip(ctx))]
pub async fn list_media(ctx: &ServiceContext) -> Result<Vec<MediaResponse>, AppError> {
    let records = ctx.metadata.scan().await.map_err(metadata_error)?;
    let known: HashSet<String> = records.iter().map(|r| r.file_key.clone()).collect();

    let orphans: Vec<MediaRecord> = match ctx.storage.list().await {
        Ok(blobs) => blobs
            .into_iter()
            .filter(|b| !known.contains(&b.key))
            .map(|b| orphan_record(ctx, &b.key, b.size))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Blob listing failed, returning records only");
            Vec::new()
        }
    };

    let mut results = Vec::with_capacity(records.len() + orphans.len());
    for record in records.into_iter().chain(orphans) {
        let url = ctx.presign_or_empty(&record.file_key).await;
        results.push(MediaResponse::from_record(record, url));
    }
    Ok(results)
}

fn orphan_record(ctx: &ServiceContext, key: &str, size: u64) -> MediaRecord {
    let name = display_name_from_key(key);
    let mut record = MediaRecord::new(
        key,
        name,
        ctx.registry.classify(name),
        content_type_for(name),
        size as i64,
    );
    if let Some(created_at) = key_timestamp(key) {
        record.created_at = created_at;
        record.updated_at = created_at;
    }
    record
}

/// Upload time encoded in the key prefix.
fn key_timestamp(key: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = key.split('_').next()?.parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

#[tracing::instrument(skip(ctx))]
pub async fn get_media(ctx: &ServiceContext, key: &str) -> Result<MediaResponse, AppError> {
    validate_key(key).map_err(storage_error)?;
    let record = ctx
        .metadata
        .get(key)
        .await
        .map_err(metadata_error)?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", key)))?;
    let url = ctx.presign(key).await?;
    Ok(MediaResponse::from_record(record, url))
}

#[tracing::instrument(skip(ctx))]
pub async fn get_transcript(ctx: &ServiceContext, key: &str) -> Result<TranscriptResponse, AppError> {
    validate_key(key).map_err(storage_error)?;
    let record = ctx
        .metadata
        .get(key)
        .await
        .map_err(metadata_error)?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", key)))?;
    Ok(TranscriptResponse {
        pending: record.is_enriching(),
        key: record.file_key,
        transcript: record.transcript,
        tags: record.tags,
    })
}

/// Remove the blob and the record, each best-effort.
///
/// Extraction jobs still running for the key keep polling; their results
/// are dropped once they find the record gone.
#[tracing::instrument(skip(ctx))]
pub async fn delete_media(ctx: &ServiceContext, key: &str) -> Result<(), AppError> {
    validate_key(key).map_err(storage_error)?;

    let blob = ctx.storage.delete(key).await;
    if let Err(e) = &blob {
        tracing::error!(file_key = %key, error = %e, "Failed to delete blob");
    }
    let record = ctx.metadata.delete(key).await;
    match &record {
        Ok(false) => tracing::debug!(file_key = %key, "No record to delete"),
        Ok(true) => {}
        Err(e) => tracing::error!(file_key = %key, error = %e, "Failed to delete record"),
    }

    match (blob, record) {
        (Err(e), Err(_)) => Err(storage_error(e)),
        _ => {
            tracing::info!(file_key = %key, "Media deleted");
            Ok(())
        }
    }
}

/// Blob bytes and content type, for serving signed local downloads.
pub async fn fetch_blob(ctx: &ServiceContext, key: &str) -> Result<(Vec<u8>, String), AppError> {
    validate_key(key).map_err(storage_error)?;
    let data = ctx.storage.get(key).await.map_err(storage_error)?;
    Ok((data, content_type_for(display_name_from_key(key)).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_timestamp() {
        let ts = key_timestamp("1700000000_abc_a.png").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(key_timestamp("notakey.png").is_none());
    }
}
