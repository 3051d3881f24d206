//! Upload orchestrator.
//!
//! Only a failed blob write (or an invalid request) fails an upload. Provider
//! failures have already degraded to empty tags inside the extractors, and a
//! failed metadata write is logged and leaves an orphan blob behind.
//!
//! The record is written as an empty placeholder right after the blob, so a
//! listing taken while extraction runs shows the upload as a record rather
//! than an orphan. Extraction results are then patched onto it.

use bytes::Bytes;
use mediatag_core::{AppError, JobKind, MediaClass, MediaRecord, RecordPatch, UploadResponse};
use mediatag_plugins::BlobRef;
use mediatag_processing::{content_type_for, extension_of, ExtractionInput, ExtractionOutcome};
use mediatag_storage::generate_file_key;

use crate::context::ServiceContext;
use crate::error::storage_error;

/// Store, tag and record one uploaded file.
///
/// `declared_type` is the client's content type; it is only used when the
/// extension does not map to one.
#[tracing::instrument(skip(ctx, data, declared_type), fields(size_bytes = data.len()))]
pub async fn upload_media(
    ctx: &ServiceContext,
    filename: &str,
    declared_type: Option<&str>,
    data: Vec<u8>,
) -> Result<UploadResponse, AppError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(AppError::BadRequest("Filename is required".to_string()));
    }
    if data.is_empty() {
        return Err(AppError::BadRequest("File is empty".to_string()));
    }
    if data.len() > ctx.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            data.len(),
            ctx.max_upload_bytes
        )));
    }

    let start = std::time::Instant::now();
    let file_key = generate_file_key(filename);
    let content_type = resolve_content_type(filename, declared_type);
    let size_bytes = data.len() as i64;
    let bytes = Bytes::from(data);

    ctx.storage
        .put(&file_key, bytes.to_vec(), &content_type)
        .await
        .map_err(|e| {
            tracing::error!(file_key = %file_key, error = %e, "Blob write failed");
            storage_error(e)
        })?;

    let media_class = ctx.registry.classify(filename);
    let mut record = MediaRecord::new(
        file_key.clone(),
        filename,
        media_class,
        content_type,
        size_bytes,
    );
    let placeholder_written = write_record(ctx, &record).await;

    let input = ExtractionInput {
        file_key: file_key.clone(),
        original_name: filename.to_string(),
        extension: extension_of(filename),
        blob: BlobRef::new(file_key.clone(), ctx.storage.object_location(&file_key))
            .with_bytes(bytes),
    };
    let (_, outcome) = ctx.registry.extract(&input).await?;

    let started_jobs = match outcome {
        ExtractionOutcome::Immediate { tags, transcript } => {
            record.tags = tags;
            record.transcript = transcript;
            Vec::new()
        }
        ExtractionOutcome::Deferred { jobs } => {
            record.pending_jobs = jobs.iter().map(|j| j.kind).collect();
            jobs
        }
    };

    let persisted = if placeholder_written {
        patch_record(ctx, &record).await
    } else {
        write_record(ctx, &record).await
    };

    if persisted {
        for job in &started_jobs {
            if let Err(e) = ctx.monitor.register(&file_key, job).await {
                tracing::error!(
                    file_key = %file_key,
                    job_kind = %job.kind,
                    error = %e,
                    "Failed to register extraction job"
                );
                release_unregistered(ctx, &file_key, job.kind).await;
            }
        }
    }

    let url = ctx.presign(&file_key).await?;

    tracing::info!(
        file_key = %file_key,
        media_class = %media_class,
        tag_count = record.tags.len(),
        pending_jobs = started_jobs.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Upload complete"
    );

    Ok(UploadResponse {
        key: file_key,
        name: record.original_name,
        url,
        message: upload_message(media_class, &input.extension, !started_jobs.is_empty()),
        tags: record.tags,
    })
}

/// Insert or replace the record. Failures are logged, never surfaced.
async fn write_record(ctx: &ServiceContext, record: &MediaRecord) -> bool {
    match ctx.metadata.put(record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                file_key = %record.file_key,
                error = %e,
                "Metadata write failed, blob stored without a record"
            );
            false
        }
    }
}

/// Fill the placeholder with extraction results.
///
/// Returns `false` when the record is gone, which happens when the file was
/// deleted while extraction ran; the record is not recreated.
async fn patch_record(ctx: &ServiceContext, record: &MediaRecord) -> bool {
    let patch = RecordPatch {
        tags: Some(record.tags.clone()),
        transcript: Some(record.transcript.clone()),
        pending_jobs: Some(record.pending_jobs.clone()),
        ..Default::default()
    };
    match ctx.metadata.update_fields(&record.file_key, &patch).await {
        Ok(true) => true,
        Ok(false) => {
            tracing::info!(
                file_key = %record.file_key,
                "Record deleted during extraction, results dropped"
            );
            false
        }
        Err(e) => {
            tracing::error!(
                file_key = %record.file_key,
                error = %e,
                "Failed to store extraction results"
            );
            false
        }
    }
}

/// Drop a part nobody will ever complete so a sibling job can still fuse.
async fn release_unregistered(ctx: &ServiceContext, file_key: &str, kind: JobKind) {
    if let Err(e) = ctx
        .metadata
        .complete_part(file_key, kind, &Default::default())
        .await
    {
        tracing::warn!(file_key = %file_key, error = %e, "Failed to release unregistered job part");
    }
}

fn resolve_content_type(filename: &str, declared_type: Option<&str>) -> String {
    let guessed = content_type_for(filename);
    match declared_type.map(str::trim) {
        Some(declared)
            if guessed == "application/octet-stream"
                && declared.contains('/')
                && !declared.contains(char::is_whitespace) =>
        {
            declared.to_string()
        }
        _ => guessed.to_string(),
    }
}

fn upload_message(class: MediaClass, extension: &str, deferred: bool) -> Option<String> {
    match class {
        MediaClass::Unsupported if extension.is_empty() => Some(
            "File has no extension; it was stored without tags".to_string(),
        ),
        MediaClass::Unsupported => Some(format!(
            "Unsupported file type '.{}'; it was stored without tags",
            extension
        )),
        _ if deferred => Some(format!(
            "Tags for this {} file will be added when background analysis completes",
            class
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_only_fills_unknown_extensions() {
        assert_eq!(resolve_content_type("a.png", Some("text/plain")), "image/png");
        assert_eq!(
            resolve_content_type("a.heic", Some("image/heic")),
            "image/heic"
        );
        assert_eq!(
            resolve_content_type("a.heic", Some("image")),
            "application/octet-stream"
        );
        assert_eq!(resolve_content_type("a.bin", None), "application/octet-stream");
    }

    #[test]
    fn test_upload_messages() {
        assert!(upload_message(MediaClass::Image, "png", false).is_none());
        assert!(upload_message(MediaClass::Unsupported, "xyz", false)
            .unwrap()
            .contains(".xyz"));
        assert!(upload_message(MediaClass::Video, "mp4", true).is_some());
    }
}
