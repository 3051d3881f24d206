//! Writing finished job results into media records.
//!
//! Each job contributes its own fields and removes its kind from the
//! record's `pending_jobs` in one atomic store call. Whichever call leaves
//! `pending_jobs` empty fuses `transcript_tags` and `visual_labels` into
//! `tags`, so a video's two jobs may land in either order.

use anyhow::Result;
use mediatag_core::{ExtractionJob, MediaRecord, RecordPatch};
use mediatag_plugins::DetectedLabel;
use mediatag_processing::strategies::text_tags;
use mediatag_processing::{fuse, rank_labels};

use crate::context::JobHandlerContext;

/// Store a transcript and the tags derived from it.
pub async fn complete_transcription(
    ctx: &JobHandlerContext,
    job: &ExtractionJob,
    transcript: String,
) -> Result<()> {
    let cfg = &ctx.caps.config;
    let transcript = transcript.trim().to_string();

    let tags = if transcript.chars().count() >= cfg.transcript_min_chars {
        text_tags(&ctx.caps, &transcript).await
    } else {
        tracing::info!(
            file_key = %job.file_key,
            chars = transcript.chars().count(),
            "Transcript too short, treating as no speech"
        );
        Vec::new()
    };

    let patch = RecordPatch {
        transcript: Some(transcript),
        transcript_tags: Some(tags),
        ..Default::default()
    };
    apply_part(ctx, job, &patch).await
}

/// Store the top per-frame labels of a video.
pub async fn complete_video_labels(
    ctx: &JobHandlerContext,
    job: &ExtractionJob,
    labels: &[DetectedLabel],
) -> Result<()> {
    let cfg = &ctx.caps.config;
    let visual_labels = rank_labels(
        labels,
        cfg.video_label_min_confidence,
        cfg.video_label_top_n,
    );
    tracing::debug!(
        file_key = %job.file_key,
        detections = labels.len(),
        kept = visual_labels.len(),
        "Video labels ranked"
    );

    let patch = RecordPatch {
        visual_labels: Some(visual_labels),
        ..Default::default()
    };
    apply_part(ctx, job, &patch).await
}

/// Mark a failed or timed-out job's part as done without contributing to it.
pub async fn release_part(ctx: &JobHandlerContext, job: &ExtractionJob) -> Result<()> {
    apply_part(ctx, job, &RecordPatch::default()).await
}

async fn apply_part(ctx: &JobHandlerContext, job: &ExtractionJob, patch: &RecordPatch) -> Result<()> {
    let Some(record) = ctx
        .metadata
        .complete_part(&job.file_key, job.kind, patch)
        .await?
    else {
        tracing::info!(
            file_key = %job.file_key,
            job_kind = %job.kind,
            "Record no longer exists, dropping job result"
        );
        return Ok(());
    };

    if record.pending_jobs.is_empty() {
        fuse_tags(ctx, &record).await?;
    } else {
        tracing::debug!(
            file_key = %record.file_key,
            pending = ?record.pending_jobs,
            "Waiting for sibling job before fusing tags"
        );
    }
    Ok(())
}

async fn fuse_tags(ctx: &JobHandlerContext, record: &MediaRecord) -> Result<()> {
    let tags = fuse(
        &[record.transcript_tags.as_slice(), record.visual_labels.as_slice()],
        ctx.caps.config.fused_max_tags,
    );

    let patch = RecordPatch {
        tags: Some(tags.clone()),
        ..Default::default()
    };
    if !ctx.metadata.update_fields(&record.file_key, &patch).await? {
        tracing::info!(file_key = %record.file_key, "Record deleted before tags were written");
        return Ok(());
    }

    tracing::info!(
        file_key = %record.file_key,
        tag_count = tags.len(),
        "Fused tags written"
    );
    Ok(())
}
