//! OpenAPI documentation, served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use mediatag_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mediatag API",
        version = "0.1.0",
        description = "Upload media, get descriptive tags back, and search stored files by keyword or in natural language."
    ),
    paths(
        handlers::files::upload_file,
        handlers::files::list_files,
        handlers::files::get_file,
        handlers::files::get_file_transcript,
        handlers::files::delete_file,
        handlers::search::search,
        handlers::search::natural_search,
        handlers::health::health_check,
        handlers::downloads::download_file,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::HealthResponse,
        models::MediaResponse,
        models::UploadResponse,
        models::TranscriptResponse,
        models::SearchResponse,
        models::SearchPass,
        models::MediaClass,
    )),
    tags(
        (name = "files", description = "Upload, list, fetch and delete media"),
        (name = "search", description = "Keyword and natural-language search"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_versioned_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/files"));
        assert!(doc.paths.paths.contains_key("/api/v1/files/{key}/transcript"));
        assert!(doc.paths.paths.contains_key("/api/v1/search/natural"));
    }
}
