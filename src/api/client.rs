use crate::api::error::ApiError;
use crate::api::types::{AudioFile, Lyrics, LyricsUpdate, Project, SourceClip};
use crate::config::ApiConfig;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

/// Beatmatchr API client.
///
/// Stateless per call: one request per operation, no retries and no caching.
/// Caching lives in [`crate::query::QueryClient`].
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = parse_base_url(&config.base_url)?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("beatmatchr/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// List every project (no pagination)
  pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
    let response = self.send(self.request(Method::GET, &["projects"])).await?;
    Ok(read_json(response).await?.unwrap_or_default())
  }

  /// Get a single project by id
  pub async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
    let response = self
      .send(self.request(Method::GET, &["projects", project_id]))
      .await?;
    read_json(response).await?.ok_or_else(|| empty_body("project"))
  }

  /// Upload an audio file to a project as multipart field `file`.
  /// The response body is ignored.
  pub async fn upload_audio(&self, project_id: &str, file: AudioFile) -> Result<(), ApiError> {
    debug!(
      project_id,
      file_name = %file.file_name,
      bytes = file.bytes.len(),
      "uploading audio"
    );

    let part = reqwest::multipart::Part::bytes(file.bytes)
      .file_name(file.file_name)
      .mime_str(file.content_type)
      .map_err(|e| ApiError::Input(format!("Invalid content type: {}", e)))?;
    let form = reqwest::multipart::Form::new().part("file", part);

    let request = self
      .request(Method::POST, &["projects", project_id, "audio"])
      .multipart(form);
    let response = self.send(request).await?;
    ensure_success(response).await?;
    Ok(())
  }

  /// List the source clips of a project
  pub async fn list_source_clips(&self, project_id: &str) -> Result<Vec<SourceClip>, ApiError> {
    let response = self
      .send(self.request(Method::GET, &["projects", project_id, "source-clips"]))
      .await?;
    Ok(read_json(response).await?.unwrap_or_default())
  }

  /// Get the lyrics of a project
  pub async fn get_lyrics(&self, project_id: &str) -> Result<Lyrics, ApiError> {
    let response = self
      .send(self.request(Method::GET, &["projects", project_id, "lyrics"]))
      .await?;
    read_json(response).await?.ok_or_else(|| empty_body("lyrics"))
  }

  /// Replace the lyrics text of a project.
  ///
  /// Only `raw_text` is sent. Returns what the server stored, which may differ
  /// from the input (normalized text, new `updated_at`), or `None` on 204.
  pub async fn replace_lyrics(
    &self,
    project_id: &str,
    lyrics: &Lyrics,
  ) -> Result<Option<Lyrics>, ApiError> {
    let body = LyricsUpdate {
      raw_text: &lyrics.raw_text,
    };
    let request = self
      .request(Method::PUT, &["projects", project_id, "lyrics"])
      .json(&body);
    let response = self.send(request).await?;
    read_json(response).await
  }

  fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
    self.http.request(method, self.endpoint(segments))
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
    let request = request.build()?;
    debug!(method = %request.method(), url = %request.url(), "request");

    self.http.execute(request).await.map_err(|e| {
      warn!("request failed: {}", e);
      ApiError::from(e)
    })
  }

  /// Base URL plus percent-encoded path segments
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}

fn parse_base_url(raw: &str) -> Result<Url> {
  let url = Url::parse(raw).map_err(|e| eyre!("Invalid API base URL {}: {}", raw, e))?;
  if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
    return Err(eyre!("API base URL must be an http(s) URL, got {}", raw));
  }
  Ok(url)
}

fn empty_body(what: &str) -> ApiError {
  ApiError::Decode(format!("Server returned no {} (204 No Content)", what))
}

/// Turn a non-2xx response into [`ApiError::Status`] carrying the body text
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let url = response.url().clone();
  let body = response.text().await.unwrap_or_default();
  warn!(%status, %url, "request returned error status");
  Err(ApiError::Status { status, body })
}

/// 204 is an empty success (`None`); any other 2xx body is decoded as JSON
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
  let response = ensure_success(response).await?;
  if response.status() == StatusCode::NO_CONTENT {
    return Ok(None);
  }

  let bytes = response.bytes().await?;
  serde_json::from_slice(&bytes)
    .map(Some)
    .map_err(|e| ApiError::Decode(format!("Failed to parse response: {}", e)))
}
