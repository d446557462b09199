//! Typed client for the video-lookup backend.
//!
//! Every call is a single JSON POST (or GET for `/health`) with no retry and no
//! timeout. Failures are folded into [`ApiError`], whose `Display` text is what the
//! user sees.

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::constants;
use crate::models::{SearchEntry, SearchOutcome, Video, VideoPayload, WakameEntry};

pub(crate) const INVALID_RESPONSE: &str = "Invalid response format";

/// Everything that can go wrong between a submit and a rendered result.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Input rejected before any request was made.
  #[error("{0}")]
  Validation(String),
  /// The backend answered with a non-2xx status.
  #[error("{message}")]
  Http { status: u16, message: String },
  /// The request never produced a response.
  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),
  /// The backend answered 2xx but the payload is unusable.
  #[error("{0}")]
  Semantic(String),
}

// --- Wire envelopes ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
  error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractResponse {
  success: bool,
  video: Option<VideoPayload>,
  error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
  success: bool,
  results: Option<Vec<SearchEntry>>,
  used_fallback: bool,
  method: Option<String>,
  instance: Option<String>,
  error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WakameResponse {
  success: bool,
  results: Option<Vec<WakameEntry>>,
  error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HealthResponse {
  status: Option<String>,
}

// --- Client ---

#[derive(Debug, Clone)]
pub struct ApiClient {
  http: Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: &str) -> anyhow::Result<Self> {
    let http = Client::builder().user_agent(&constants().user_agent).build().context("Failed to build HTTP client")?;
    Ok(Self::with_client(http, base_url))
  }

  pub fn with_client(http: Client, base_url: &str) -> Self {
    Self { http, base_url: base_url.trim_end_matches('/').to_string() }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// The underlying HTTP client, shared with downloads.
  pub fn http(&self) -> &Client {
    &self.http
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// POST `body` to `path` and decode the 2xx payload. Non-2xx answers become
  /// [`ApiError::Http`] carrying the server's `error` field or `fallback`.
  async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value, fallback: &str) -> Result<T, ApiError> {
    let url = self.endpoint(path);
    debug!(url = %url, "api: POST");
    let response = self.http.post(&url).json(&body).send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
      let message = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());
      warn!(url = %url, status = status.as_u16(), message = %message, "api: request failed");
      return Err(ApiError::Http { status: status.as_u16(), message });
    }

    serde_json::from_slice::<T>(&bytes).map_err(|e| {
      warn!(url = %url, err = %e, "api: undecodable response");
      ApiError::Semantic(INVALID_RESPONSE.to_string())
    })
  }

  /// Resolve a video URL into metadata and direct format URLs.
  pub async fn extract(&self, url: &str) -> Result<Video, ApiError> {
    let url = url.trim();
    if url.is_empty() {
      return Err(ApiError::Validation("Please enter a YouTube URL".to_string()));
    }
    let resp: ExtractResponse = self.post("/extract", json!({ "url": url }), "Unknown error occurred").await?;
    match resp {
      ExtractResponse { success: true, video: Some(video), .. } => {
        video.into_video().ok_or_else(|| ApiError::Semantic(INVALID_RESPONSE.to_string()))
      }
      ExtractResponse { error, .. } => Err(ApiError::Semantic(error.unwrap_or_else(|| INVALID_RESPONSE.to_string()))),
    }
  }

  /// Keyword search through the selectable instance backend.
  pub async fn search_videos(&self, query: &str, instance: &str) -> Result<SearchOutcome, ApiError> {
    let query = query.trim();
    if query.is_empty() {
      return Err(ApiError::Validation("Enter a search keyword".to_string()));
    }
    let body = json!({ "query": query, "instance": instance });
    let resp: SearchResponse = self.post("/search-videos", body, "An error occurred while searching").await?;
    match resp {
      SearchResponse { success: true, results: Some(results), used_fallback, method, instance, .. } => {
        Ok(SearchOutcome { results, used_fallback, method, instance })
      }
      SearchResponse { error, .. } => Err(ApiError::Semantic(error.unwrap_or_else(|| INVALID_RESPONSE.to_string()))),
    }
  }

  /// Keyword search through the alternate backend.
  pub async fn wakame_search(&self, query: &str) -> Result<Vec<WakameEntry>, ApiError> {
    let query = query.trim();
    if query.is_empty() {
      return Err(ApiError::Validation("Enter a search keyword".to_string()));
    }
    let resp: WakameResponse =
      self.post("/wakame-search", json!({ "query": query }), "An error occurred while searching").await?;
    match resp {
      WakameResponse { success: true, results: Some(results), .. } => Ok(results),
      WakameResponse { error, .. } => Err(ApiError::Semantic(error.unwrap_or_else(|| INVALID_RESPONSE.to_string()))),
    }
  }

  /// `true` when `/health` answers 200 with `status: "healthy"`.
  pub async fn health(&self) -> Result<bool, ApiError> {
    let response = self.http.get(self.endpoint("/health")).send().await?;
    if response.status() != StatusCode::OK {
      return Ok(false);
    }
    let body: HealthResponse = response.json().await.unwrap_or_default();
    Ok(body.status.as_deref() == Some("healthy"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_client(Client::new(), &server.uri())
  }

  fn video_json() -> serde_json::Value {
    json!({
      "success": true,
      "video": {
        "title": "Sample",
        "uploader": "Channel",
        "duration": 185,
        "thumbnail": "https://i.example/t.jpg",
        "formats": [
          {"format_id": "18", "quality": "360p", "height": 360, "fps": 30, "filesize": 1024, "url": "https://cdn/18"},
          {"format_id": "22", "quality": "720p", "height": 720, "fps": 30, "filesize": null, "url": "https://cdn/22"}
        ]
      }
    })
  }

  // --- extract ---

  #[tokio::test]
  async fn extract_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/extract"))
      .and(body_json(json!({"url": "https://youtu.be/abc"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(video_json()))
      .expect(1)
      .mount(&server)
      .await;

    let video = client(&server).extract("  https://youtu.be/abc ").await.unwrap();
    assert_eq!(video.title, "Sample");
    assert_eq!(video.formats.len(), 2);
    assert_eq!(video.best_format().map(|f| f.url.as_str()), Some("https://cdn/22"));
  }

  #[tokio::test]
  async fn extract_empty_url_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let err = client(&server).extract("   ").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
  }

  #[tokio::test]
  async fn extract_http_error_uses_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/extract"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Please enter a valid YouTube URL"})))
      .mount(&server)
      .await;

    let err = client(&server).extract("not-a-url").await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));
    assert_eq!(err.to_string(), "Please enter a valid YouTube URL");
  }

  #[tokio::test]
  async fn extract_http_error_without_body_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/extract"))
      .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
      .mount(&server)
      .await;

    let err = client(&server).extract("https://youtu.be/abc").await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown error occurred");
  }

  #[tokio::test]
  async fn extract_success_false_is_semantic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/extract"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
      .mount(&server)
      .await;

    let err = client(&server).extract("https://youtu.be/abc").await.unwrap_err();
    assert!(matches!(err, ApiError::Semantic(_)));
    assert_eq!(err.to_string(), "Invalid response format");
  }

  #[tokio::test]
  async fn extract_missing_video_is_semantic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/extract"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
      .mount(&server)
      .await;

    let err = client(&server).extract("https://youtu.be/abc").await.unwrap_err();
    assert!(matches!(err, ApiError::Semantic(_)));
  }

  #[tokio::test]
  async fn extract_without_format_list_is_semantic() {
    for video in [json!({"title": "t"}), json!({"title": "t", "formats": null})] {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "video": video})))
        .mount(&server)
        .await;

      let err = client(&server).extract("https://youtu.be/abc").await.unwrap_err();
      assert!(matches!(err, ApiError::Semantic(_)));
      assert_eq!(err.to_string(), "Invalid response format");
    }
  }

  #[tokio::test]
  async fn extract_empty_format_list_is_a_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/extract"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "video": {"title": "t", "formats": []}})))
      .mount(&server)
      .await;

    let video = client(&server).extract("https://youtu.be/abc").await.unwrap();
    assert!(video.formats.is_empty());
  }

  #[tokio::test]
  async fn extract_unreachable_server_is_network_error() {
    let api = ApiClient::with_client(Client::new(), "http://127.0.0.1:9");
    let err = api.extract("https://youtu.be/abc").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
  }

  // --- search ---

  #[tokio::test]
  async fn search_sends_instance_and_reads_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/search-videos"))
      .and(body_json(json!({"query": "lofi", "instance": "yewtu.be"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "results": [{"videoId": "v1", "title": "Lofi", "author": "A", "viewCount": 1200}],
        "used_fallback": true,
        "method": "invidious",
        "instance": "invidious.fdn.fr"
      })))
      .expect(1)
      .mount(&server)
      .await;

    let outcome = client(&server).search_videos("lofi", "yewtu.be").await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].video_id, "v1");
    assert!(outcome.used_fallback);
    assert_eq!(
      outcome.fallback_notice("yewtu.be").as_deref(),
      Some("Used invidious.fdn.fr server (yewtu.be unavailable)")
    );
  }

  #[tokio::test]
  async fn search_total_failure_surfaces_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/search-videos"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "All search methods failed"})))
      .mount(&server)
      .await;

    let err = client(&server).search_videos("lofi", "auto").await.unwrap_err();
    assert_eq!(err.to_string(), "All search methods failed");
  }

  #[tokio::test]
  async fn search_without_results_field_is_semantic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/search-videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
      .mount(&server)
      .await;

    let err = client(&server).search_videos("lofi", "auto").await.unwrap_err();
    assert!(matches!(err, ApiError::Semantic(_)));
  }

  // --- wakame ---

  #[tokio::test]
  async fn wakame_search_reads_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/wakame-search"))
      .and(body_json(json!({"query": "cats"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "results": [{"title": "Cats", "url": "https://www.youtube.com/watch?v=c", "uploader": "U",
                     "views": "10K views", "published_time": "1 day ago", "duration_formatted": "3:10"}]
      })))
      .mount(&server)
      .await;

    let results = client(&server).wakame_search("cats").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].duration_formatted.as_deref(), Some("3:10"));
  }

  // --- health ---

  #[tokio::test]
  async fn health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/health"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
      .mount(&server)
      .await;

    assert!(client(&server).health().await.unwrap());
  }

  #[tokio::test]
  async fn health_non_ok_status_is_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/health"))
      .respond_with(ResponseTemplate::new(503).set_body_json(json!({"status": "healthy"})))
      .mount(&server)
      .await;

    assert!(!client(&server).health().await.unwrap());
  }

  #[tokio::test]
  async fn health_unreachable_server_is_network_error() {
    let api = ApiClient::with_client(Client::new(), "http://127.0.0.1:9");
    assert!(matches!(api.health().await, Err(ApiError::Network(_))));
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let api = ApiClient::with_client(Client::new(), "http://localhost:5000/");
    assert_eq!(api.base_url(), "http://localhost:5000");
  }
}
