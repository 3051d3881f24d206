use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use mediatag_core::{SearchQuery, SearchResponse};
use mediatag_services::{keyword_search, natural_language_search};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Records whose name or tags contain the query", body = SearchResponse),
        (status = 500, description = "Metadata store failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(query = %params.q))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, HttpAppError> {
    Ok(Json(keyword_search(&state.services, &params.q).await?))
}

/// Natural-language search. Completion failures and a missing completion
/// provider both yield an empty result, never an error status.
#[utoipa::path(
    get,
    path = "/api/v1/search/natural",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matches from the first pass that found any", body = SearchResponse),
        (status = 500, description = "Metadata store failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(query = %params.q))]
pub async fn natural_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, HttpAppError> {
    Ok(Json(natural_language_search(&state.services, &params.q).await?))
}
