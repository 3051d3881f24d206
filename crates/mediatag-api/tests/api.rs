//! HTTP surface tests against in-memory stores and fake providers.
//!
//! Run with: `cargo test -p mediatag-api --test api`

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use mediatag_api::setup::routes::setup_routes;
use mediatag_api::AppState;
use mediatag_core::config::MediaTagConfig;
use mediatag_core::{Config, ExtractionConfig, JobMonitorConfig};
use mediatag_db::{MemoryJobStore, MemoryMetadataStore, MetadataStore};
use mediatag_plugins::capabilities::JobPoll;
use mediatag_plugins::test_helpers::{
    label, FakeCompleter, FakeKeyPhraseExtractor, FakeLabelDetector, FakeOcrEngine, FakePoll,
    FakeTranscriber,
};
use mediatag_plugins::TextCompleter;
use mediatag_processing::{Capabilities, ExtractorRegistry};
use mediatag_services::ServiceContext;
use mediatag_storage::{LocalStorage, MemoryStorage, Storage, UrlSigner};
use mediatag_worker::{run_due_jobs, JobHandlerContext, JobMonitor};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SIGNING_SECRET: &str = "0123456789abcdef0123456789abcdef";
const LOCAL_BASE_URL: &str = "http://localhost/files";

struct TestApp {
    server: TestServer,
    metadata: Arc<MemoryMetadataStore>,
    jobs: Arc<MemoryJobStore>,
    labels: Arc<FakeLabelDetector>,
    transcriber: Arc<FakeTranscriber>,
    completer: Arc<FakeCompleter>,
    caps: Capabilities,
}

impl TestApp {
    async fn run_jobs(&self) {
        let worker = JobHandlerContext::new(
            self.metadata.clone(),
            self.jobs.clone(),
            self.caps.clone(),
            JobMonitorConfig::default(),
        );
        self.jobs.make_all_due().await;
        run_due_jobs(&worker).await.expect("job run failed");
    }
}

fn setup_test_app() -> TestApp {
    build_app(Arc::new(MemoryStorage::new()), None, true)
}

fn build_app(storage: Arc<dyn Storage>, signer: Option<UrlSigner>, with_completer: bool) -> TestApp {
    let metadata = Arc::new(MemoryMetadataStore::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let labels = Arc::new(FakeLabelDetector::new());
    let transcriber = Arc::new(FakeTranscriber::new());
    let completer = Arc::new(FakeCompleter::new());
    let caps = Capabilities {
        labels: labels.clone(),
        key_phrases: Arc::new(FakeKeyPhraseExtractor::new()),
        transcriber: transcriber.clone(),
        ocr: Arc::new(FakeOcrEngine::default()),
        config: ExtractionConfig::default(),
    };

    let services = ServiceContext {
        storage,
        metadata: metadata.clone(),
        jobs: jobs.clone(),
        registry: Arc::new(ExtractorRegistry::new(caps.clone())),
        monitor: JobMonitor::new_no_worker(jobs.clone(), JobMonitorConfig::default()),
        completer: with_completer.then(|| completer.clone() as Arc<dyn TextCompleter>),
        url_ttl: Duration::from_secs(3600),
        max_upload_bytes: 1024,
    };

    let config = Config::new(MediaTagConfig {
        max_upload_size_bytes: 1024,
        ..Default::default()
    });
    let state = Arc::new(AppState::new(services, signer));
    let router = setup_routes(&config, state).expect("router setup failed");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        metadata,
        jobs,
        labels,
        transcriber,
        completer,
        caps,
    }
}

fn file_form(filename: &str, mime: &str, data: &[u8]) -> MultipartForm {
    let part = Part::bytes(data.to_vec())
        .file_name(filename.to_string())
        .mime_type(mime.to_string());
    MultipartForm::new().add_part("file", part)
}

async fn upload(app: &TestApp, filename: &str, mime: &str, data: &[u8]) -> Value {
    let response = app
        .server
        .post("/api/v1/files")
        .multipart(file_form(filename, mime, data))
        .await;
    assert_eq!(response.status_code(), 201);
    response.json()
}

#[tokio::test]
async fn test_health_reports_storage_backend() {
    let app = setup_test_app();

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage_backend"], "memory");
}

#[tokio::test]
async fn test_image_upload_then_list_get_and_search() {
    let app = setup_test_app();
    app.labels
        .set_image_labels(vec![label("Dog", 98.0), label("Grass", 93.0), label("Blur", 75.0)]);

    let uploaded = upload(&app, "puppy.png", "image/png", b"png bytes").await;
    let key = uploaded["key"].as_str().expect("key").to_string();
    assert_eq!(uploaded["name"], "puppy.png");
    assert_eq!(uploaded["tags"], serde_json::json!(["Dog", "Grass"]));
    assert!(uploaded["url"].as_str().expect("url").contains(&key));

    let list: Value = app.server.get("/api/v1/files").await.json();
    let items = list.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"], key.as_str());

    let single = app.server.get(&format!("/api/v1/files/{}", key)).await;
    assert_eq!(single.status_code(), 200);
    let single: Value = single.json();
    assert_eq!(single["media_class"], "image");
    assert_eq!(single["tags"], serde_json::json!(["Dog", "Grass"]));

    let search: Value = app
        .server
        .get("/api/v1/search")
        .add_query_param("q", "grass")
        .await
        .json();
    assert_eq!(search["count"], 1);
    assert_eq!(search["results"][0]["key"], key.as_str());
}

#[tokio::test]
async fn test_declared_type_field_overrides_part_content_type() {
    let app = setup_test_app();
    let form = file_form("notes.txt", "application/octet-stream", b"alpha bravo charlie")
        .add_text("type", "text/plain");

    let response = app.server.post("/api/v1/files").multipart(form).await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let key = body["key"].as_str().expect("key");
    let record: Value = app
        .server
        .get(&format!("/api/v1/files/{}", key))
        .await
        .json();
    assert_eq!(record["content_type"], "text/plain");
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let app = setup_test_app();
    let form = MultipartForm::new().add_text("type", "image/png");

    let response = app.server.post("/api/v1/files").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_oversized_upload_returns_413() {
    let app = setup_test_app();

    let response = app
        .server
        .post("/api/v1/files")
        .multipart(file_form("big.txt", "text/plain", &[b'a'; 4096]))
        .await;

    assert_eq!(response.status_code(), 413);
    assert!(app.metadata.scan().await.expect("scan").is_empty());
}

#[tokio::test]
async fn test_unsupported_upload_is_stored_with_message() {
    let app = setup_test_app();

    let body = upload(&app, "archive.xyz", "application/octet-stream", b"data").await;

    assert_eq!(body["tags"], serde_json::json!([]));
    assert!(body["message"].as_str().expect("message").contains("xyz"));
    assert_eq!(app.labels.total_calls(), 0);
}

#[tokio::test]
async fn test_unknown_key_returns_404() {
    let app = setup_test_app();

    let response = app.server.get("/api/v1/files/1700000000_abc_missing.png").await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["recoverable"], false);
}

#[tokio::test]
async fn test_video_transcript_is_pending_until_jobs_finish() {
    let app = setup_test_app();

    let uploaded = upload(&app, "surf.mp4", "video/mp4", b"video bytes").await;
    let key = uploaded["key"].as_str().expect("key").to_string();
    assert_eq!(uploaded["tags"], serde_json::json!([]));

    let pending: Value = app
        .server
        .get(&format!("/api/v1/files/{}/transcript", key))
        .await
        .json();
    assert_eq!(pending["pending"], true);
    assert_eq!(pending["transcript"], "");

    app.transcriber.complete_with("surfing lessons at the ocean today");
    app.labels.set_video_poll(FakePoll::Poll(JobPoll::Succeeded(vec![
        label("Person", 95.0),
        label("Beach", 88.0),
    ])));
    app.run_jobs().await;

    let done: Value = app
        .server
        .get(&format!("/api/v1/files/{}/transcript", key))
        .await
        .json();
    assert_eq!(done["pending"], false);
    assert_eq!(done["transcript"], "surfing lessons at the ocean today");
    assert_eq!(
        done["tags"],
        serde_json::json!(["surfing", "lessons", "ocean", "today", "Person", "Beach"])
    );
}

#[tokio::test]
async fn test_natural_search_returns_matched_pass() {
    let app = setup_test_app();
    app.labels.set_image_labels(vec![label("Mountain", 97.0)]);
    upload(&app, "alps.jpg", "image/jpeg", b"jpeg").await;
    app.completer.push_reply("1");

    let response = app
        .server
        .get("/api/v1/search/natural")
        .add_query_param("q", "photos of hills")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["matched_pass"], "strict");
    assert_eq!(body["results"][0]["name"], "alps.jpg");
}

#[tokio::test]
async fn test_natural_search_without_completer_is_empty() {
    let app = build_app(Arc::new(MemoryStorage::new()), None, false);
    upload(&app, "notes.txt", "text/plain", b"meeting agenda notes").await;

    let response = app
        .server
        .get("/api/v1/search/natural")
        .add_query_param("q", "agenda")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["count"], 0);
    assert_eq!(app.completer.call_count(), 0);
}

#[tokio::test]
async fn test_delete_removes_record() {
    let app = setup_test_app();
    let uploaded = upload(&app, "todo.txt", "text/plain", b"water plants").await;
    let key = uploaded["key"].as_str().expect("key").to_string();

    let response = app.server.delete(&format!("/api/v1/files/{}", key)).await;
    assert_eq!(response.status_code(), 204);

    let response = app.server.get(&format!("/api/v1/files/{}", key)).await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_signed_local_download_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = LocalStorage::new(
        dir.path(),
        LOCAL_BASE_URL.to_string(),
        SIGNING_SECRET.as_bytes(),
    )
    .await
    .expect("local storage");
    let signer = UrlSigner::new(SIGNING_SECRET.as_bytes(), LOCAL_BASE_URL).expect("signer");
    let app = build_app(Arc::new(storage), Some(signer), true);

    let uploaded = upload(&app, "readme.txt", "text/plain", b"hello local disk").await;
    let url = uploaded["url"].as_str().expect("url");
    let path = url.trim_start_matches("http://localhost");

    let response = app.server.get(path).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.as_bytes().to_vec(), b"hello local disk".to_vec());
    assert_eq!(response.header("content-type"), "text/plain");

    let tampered = format!("{}0", path);
    let response = app.server.get(&tampered).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_direct_download_not_served_for_memory_backend() {
    let app = setup_test_app();

    let response = app
        .server
        .get("/files/1700000000_abc_note.txt")
        .add_query_param("expires", "9999999999")
        .add_query_param("signature", "00")
        .await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app();

    let response = app.server.get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["/api/v1/search/natural"].is_object());
}
