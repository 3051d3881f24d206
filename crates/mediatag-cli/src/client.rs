//! Thin reqwest client over the `/api/v1` routes.

use anyhow::{Context, Result};
use mediatag_core::{MediaResponse, SearchResponse, TranscriptResponse, UploadResponse};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

const API_PREFIX: &str = "/api/v1";

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn file_url(&self, key: &str, suffix: &str) -> String {
        self.url(&format!("/files/{}{}", urlencoding::encode(key), suffix))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await.context("Failed to send request")?).await?;
        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// Upload a local file. `declared_type` is sent as the `type` form field.
    pub async fn upload(&self, path: &Path, declared_type: Option<&str>) -> Result<UploadResponse> {
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
        }
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Path has no file name")?
            .to_string();

        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(data).file_name(filename),
        );
        if let Some(declared) = declared_type {
            form = form.text("type", declared.to_string());
        }

        self.send(self.client.post(self.url("/files")).multipart(form))
            .await
    }

    pub async fn list(&self) -> Result<Vec<MediaResponse>> {
        self.send(self.client.get(self.url("/files"))).await
    }

    pub async fn get(&self, key: &str) -> Result<MediaResponse> {
        self.send(self.client.get(self.file_url(key, ""))).await
    }

    pub async fn transcript(&self, key: &str) -> Result<TranscriptResponse> {
        self.send(self.client.get(self.file_url(key, "/transcript")))
            .await
    }

    /// Keyword search, or natural-language search when `natural` is set.
    pub async fn search(&self, query: &str, natural: bool) -> Result<SearchResponse> {
        let path = if natural { "/search/natural" } else { "/search" };
        self.send(self.client.get(self.url(path)).query(&[("q", query)]))
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.file_url(key, ""))
            .send()
            .await
            .context("Failed to send request")?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow::anyhow!(
        "API request failed with status {}: {}",
        status,
        error_text
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    fn media_json(key: &str) -> serde_json::Value {
        serde_json::json!({
            "key": key,
            "name": "cat.jpg",
            "url": "https://bucket.example/cat.jpg",
            "tags": ["Cat"],
            "transcript": "",
            "media_class": "image",
            "content_type": "image/jpeg",
            "size_bytes": 4,
            "pending": false,
            "created_at": "2024-05-01T12:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_upload_posts_multipart_with_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/files")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data.*".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"file\"; filename=\"cat.jpg\"".to_string()),
                Matcher::Regex("image/jpeg".to_string()),
            ]))
            .with_status(201)
            .with_body(
                serde_json::json!({
                    "key": "1700000000_ab12cd34_cat.jpg",
                    "name": "cat.jpg",
                    "url": "https://bucket.example/cat.jpg",
                    "tags": ["Cat"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.jpg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"jpeg")
            .unwrap();

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.upload(&path, Some("image/jpeg")).await.unwrap();

        assert_eq!(response.key, "1700000000_ab12cd34_cat.jpg");
        assert_eq!(response.tags, vec!["Cat"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_natural_search_hits_natural_route() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/search/natural")
            .match_query(Matcher::UrlEncoded("q".into(), "cats on rugs".into()))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "query": "cats on rugs",
                    "matched_pass": "lenient",
                    "results": [media_json("1700000000_ab12cd34_cat.jpg")],
                    "count": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.search("cats on rugs", true).await.unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].name, "cat.jpg");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/files/missing.txt")
            .with_status(404)
            .with_body(r#"{"error":"Not found","code":"NOT_FOUND","recoverable":false}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.get("missing.txt").await.unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v1/files/1700000000_ab12cd34_cat.jpg")
            .with_status(204)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/", server.url())).unwrap();
        client.delete("1700000000_ab12cd34_cat.jpg").await.unwrap();

        mock.assert_async().await;
    }
}
