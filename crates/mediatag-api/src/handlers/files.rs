//! Upload, listing, retrieval and deletion of media files.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mediatag_core::{AppError, MediaResponse, TranscriptResponse, UploadResponse};
use mediatag_services::{delete_media, get_media, get_transcript, list_media, upload_media};
use std::sync::Arc;

struct UploadPart {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/v1/files",
    tag = "files",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "`file` part (required) and optional `type` part with the MIME type"
    ),
    responses(
        (status = 201, description = "File stored and tagged", body = UploadResponse),
        (status = 400, description = "Missing file or filename", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Blob store failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut part: Option<UploadPart> = None;
    let mut declared_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                part = Some(UploadPart {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            Some("type") => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    declared_type = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let part = part
        .ok_or_else(|| AppError::BadRequest("Missing multipart field 'file'".to_string()))?;
    let content_type = declared_type.or(part.content_type);

    let response: UploadResponse = upload_media(
        &state.services,
        &part.filename,
        content_type.as_deref(),
        part.data,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "files",
    responses(
        (status = 200, description = "Every stored file with a fresh URL", body = [MediaResponse]),
        (status = 500, description = "Metadata store failure", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MediaResponse>>, HttpAppError> {
    Ok(Json(list_media(&state.services).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{key}",
    tag = "files",
    params(("key" = String, Path, description = "File key returned by the upload")),
    responses(
        (status = 200, description = "File record", body = MediaResponse),
        (status = 404, description = "Unknown key", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<MediaResponse>, HttpAppError> {
    Ok(Json(get_media(&state.services, &key).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{key}/transcript",
    tag = "files",
    params(("key" = String, Path, description = "File key returned by the upload")),
    responses(
        (status = 200, description = "Transcript and tags; `pending` while jobs run", body = TranscriptResponse),
        (status = 404, description = "Unknown key", body = ErrorResponse)
    )
)]
pub async fn get_file_transcript(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<TranscriptResponse>, HttpAppError> {
    Ok(Json(get_transcript(&state.services, &key).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/{key}",
    tag = "files",
    params(("key" = String, Path, description = "File key returned by the upload")),
    responses(
        (status = 204, description = "Blob and record removed"),
        (status = 400, description = "Malformed key", body = ErrorResponse),
        (status = 500, description = "Both blob and record deletion failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_key = %key, operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    delete_media(&state.services, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
