//! Signed downloads for the local filesystem backend.
//!
//! S3 URLs point at the bucket directly; local URLs point back here and carry
//! an HMAC signature with an expiry, checked before any bytes are read.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use mediatag_core::AppError;
use mediatag_services::{fetch_blob, storage_error};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignedUrlParams {
    /// Unix timestamp after which the URL is rejected
    pub expires: i64,
    /// Hex HMAC-SHA256 of the key and expiry
    pub signature: String,
}

#[utoipa::path(
    get,
    path = "/files/{key}",
    tag = "files",
    params(
        ("key" = String, Path, description = "File key"),
        SignedUrlParams
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 400, description = "Bad or expired signature", body = ErrorResponse),
        (status = 404, description = "Unknown key or backend does not serve files", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(file_key = %key))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<SignedUrlParams>,
) -> Result<impl IntoResponse, HttpAppError> {
    let signer = state.signer.as_ref().ok_or_else(|| {
        AppError::NotFound("Direct downloads are not served by this storage backend".to_string())
    })?;

    signer
        .verify(&key, params.expires, &params.signature)
        .map_err(storage_error)?;

    let (data, content_type) = fetch_blob(&state.services, &key).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}
