//! Test helpers: a fake Beatmatchr backend and polling utilities.
//!
//! The backend is an axum router on an ephemeral local port. It mimics the
//! real server closely enough for the client: plain-text error bodies, lyrics
//! trimmed and stamped on save (only when they already exist), uploads
//! rejected unless the part is audio.
//! Every request is counted per "METHOD /path" (path relative to `/api`).

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::types::{Lyrics, Project, SourceClip};
use crate::api::ApiClient;
use crate::config::ApiConfig;

/// One multipart upload the backend received
#[derive(Debug, Clone)]
pub struct UploadRecord {
  pub project_id: String,
  pub file_name: Option<String>,
  pub content_type: Option<String>,
  pub len: usize,
}

#[derive(Default)]
struct BackendState {
  projects: Vec<Project>,
  clips: HashMap<String, Vec<SourceClip>>,
  lyrics: HashMap<String, Lyrics>,
  uploads: Vec<UploadRecord>,
  hits: HashMap<String, usize>,
  /// Project ids whose routes answer 500 with an empty body
  broken: HashSet<String>,
  /// Project ids whose sub-resources (not the project itself) answer 204
  no_content: HashSet<String>,
  clock: u32,
}

impl BackendState {
  fn hit(&mut self, method: &str, path: String) {
    *self.hits.entry(format!("{} {}", method, path)).or_default() += 1;
  }

  fn has_project(&self, id: &str) -> bool {
    self.projects.iter().any(|p| p.id == id)
  }
}

type SharedState = Arc<Mutex<BackendState>>;

pub struct FakeBackend {
  state: SharedState,
  base_url: String,
}

impl FakeBackend {
  pub async fn start() -> Self {
    let state = SharedState::default();

    let router = Router::new()
      .route("/api/projects", get(list_projects))
      .route("/api/projects/:id", get(get_project))
      .route("/api/projects/:id/audio", post(upload_audio))
      .route("/api/projects/:id/source-clips", get(list_source_clips))
      .route("/api/projects/:id/lyrics", get(get_lyrics).put(put_lyrics))
      .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
      .await
      .expect("bind fake backend");
    let addr = listener.local_addr().expect("fake backend address");
    tokio::spawn(async move {
      let _ = axum::serve(listener, router).await;
    });

    Self {
      state,
      base_url: format!("http://{}/api", addr),
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn api(&self) -> ApiClient {
    ApiClient::new(&ApiConfig {
      base_url: self.base_url.clone(),
    })
    .expect("api client for fake backend")
  }

  fn state(&self) -> std::sync::MutexGuard<'_, BackendState> {
    self.state.lock().expect("fake backend state")
  }

  pub fn add_project(&self, id: &str, name: &str) {
    let mut state = self.state();
    state.projects.push(Project {
      id: id.to_string(),
      name: name.to_string(),
      description: None,
      created_at: Some("2024-03-01T12:00:00".to_string()),
    });
    state.clips.entry(id.to_string()).or_default();
  }

  pub fn add_clip(&self, project_id: &str, clip: SourceClip) {
    self
      .state()
      .clips
      .entry(project_id.to_string())
      .or_default()
      .push(clip);
  }

  pub fn set_lyrics(&self, project_id: &str, text: &str) {
    self.state().lyrics.insert(
      project_id.to_string(),
      Lyrics {
        raw_text: text.to_string(),
        updated_at: Some("2024-03-01T12:00:00".to_string()),
        project_id: Some(project_id.to_string()),
        source: Some("transcription".to_string()),
        created_at: Some("2024-03-01T12:00:00".to_string()),
      },
    );
  }

  pub fn fail_with_empty_body(&self, project_id: &str) {
    self.state().broken.insert(project_id.to_string());
  }

  pub fn reply_no_content(&self, project_id: &str) {
    self.state().no_content.insert(project_id.to_string());
  }

  pub fn uploads(&self) -> Vec<UploadRecord> {
    self.state().uploads.clone()
  }

  /// Requests seen for `method` + `path` (path relative to `/api`)
  pub fn hits(&self, method: &str, path: &str) -> usize {
    self
      .state()
      .hits
      .get(&format!("{} {}", method, path))
      .copied()
      .unwrap_or(0)
  }

  pub fn total_hits(&self) -> usize {
    self.state().hits.values().sum()
  }
}

fn not_found(body: &'static str) -> Response {
  (StatusCode::NOT_FOUND, body).into_response()
}

/// 500/204 overrides configured for a project's routes
fn override_response(state: &BackendState, id: &str) -> Option<Response> {
  if state.broken.contains(id) {
    return Some(StatusCode::INTERNAL_SERVER_ERROR.into_response());
  }
  if state.no_content.contains(id) {
    return Some(StatusCode::NO_CONTENT.into_response());
  }
  None
}

async fn list_projects(State(state): State<SharedState>) -> Response {
  let mut state = state.lock().expect("fake backend state");
  state.hit("GET", "/projects".to_string());
  Json(state.projects.clone()).into_response()
}

async fn get_project(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
  let mut state = state.lock().expect("fake backend state");
  state.hit("GET", format!("/projects/{}", id));
  if state.broken.contains(&id) {
    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
  }
  match state.projects.iter().find(|p| p.id == id) {
    Some(project) => Json(project.clone()).into_response(),
    None => not_found("not found"),
  }
}

async fn list_source_clips(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
  let mut state = state.lock().expect("fake backend state");
  state.hit("GET", format!("/projects/{}/source-clips", id));
  if let Some(response) = override_response(&state, &id) {
    return response;
  }
  match state.clips.get(&id) {
    Some(clips) => Json(clips.clone()).into_response(),
    None => not_found("Project not found"),
  }
}

async fn get_lyrics(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
  let mut state = state.lock().expect("fake backend state");
  state.hit("GET", format!("/projects/{}/lyrics", id));
  if let Some(response) = override_response(&state, &id) {
    return response;
  }
  if !state.has_project(&id) {
    return not_found("Project not found");
  }
  match state.lyrics.get(&id) {
    Some(lyrics) => Json(lyrics.clone()).into_response(),
    None => not_found("Lyrics not found"),
  }
}

async fn put_lyrics(
  State(state): State<SharedState>,
  Path(id): Path<String>,
  Json(body): Json<serde_json::Value>,
) -> Response {
  let mut state = state.lock().expect("fake backend state");
  state.hit("PUT", format!("/projects/{}/lyrics", id));

  let text = body
    .get("raw_text")
    .and_then(|v| v.as_str())
    .map(str::trim)
    .unwrap_or_default()
    .to_string();
  if text.is_empty() {
    return (StatusCode::BAD_REQUEST, "raw_text must be provided").into_response();
  }
  if !state.has_project(&id) {
    return not_found("Project not found");
  }
  if let Some(response) = override_response(&state, &id) {
    return response;
  }

  state.clock += 1;
  let stamp = format!("2024-03-02T09:00:{:02}", state.clock);
  // Only existing lyrics can be replaced; the text keeps its source
  let Some(lyrics) = state.lyrics.get_mut(&id) else {
    return not_found("Lyrics not found");
  };
  lyrics.raw_text = text;
  lyrics.updated_at = Some(stamp);
  Json(lyrics.clone()).into_response()
}

async fn upload_audio(
  State(state): State<SharedState>,
  Path(id): Path<String>,
  mut multipart: Multipart,
) -> Response {
  {
    let mut state = state.lock().expect("fake backend state");
    state.hit("POST", format!("/projects/{}/audio", id));
    if !state.has_project(&id) {
      return not_found("Project not found");
    }
  }

  while let Ok(Some(field)) = multipart.next_field().await {
    if field.name() != Some("file") {
      continue;
    }
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    if !content_type.as_deref().unwrap_or("").starts_with("audio/") {
      return (StatusCode::BAD_REQUEST, "Uploaded file must be audio").into_response();
    }
    let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);

    let mut state = state.lock().expect("fake backend state");
    let clip_id = format!("clip-{}", state.uploads.len() + 1);
    state.uploads.push(UploadRecord {
      project_id: id.clone(),
      file_name: file_name.clone(),
      content_type,
      len,
    });
    state.clips.entry(id.clone()).or_default().push(SourceClip {
      id: clip_id.clone(),
      name: file_name.unwrap_or_else(|| "audio".to_string()),
      duration: None,
      waveform_url: None,
    });
    return (
      StatusCode::CREATED,
      Json(serde_json::json!({ "audio_track_id": clip_id, "project_id": id })),
    )
      .into_response();
  }

  (StatusCode::UNPROCESSABLE_ENTITY, "file field is required").into_response()
}

/// Poll `cond` until it holds, for up to about two seconds
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
  for _ in 0..400 {
    if cond() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
  cond()
}

/// Write `bytes` to a fresh file named `name` under the temp dir
pub fn write_temp_file(name: &str, bytes: &[u8]) -> PathBuf {
  static COUNTER: AtomicUsize = AtomicUsize::new(0);
  let dir = std::env::temp_dir().join(format!(
    "beatmatchr-test-{}-{}",
    std::process::id(),
    COUNTER.fetch_add(1, Ordering::SeqCst)
  ));
  std::fs::create_dir_all(&dir).expect("create temp dir");
  let path = dir.join(name);
  std::fs::write(&path, bytes).expect("write temp file");
  path
}

/// Rendered TestBackend contents, one line per row
pub fn buffer_text(terminal: &ratatui::Terminal<ratatui::backend::TestBackend>) -> String {
  let buffer = terminal.backend().buffer();
  let width = buffer.area.width as usize;
  buffer
    .content()
    .chunks(width.max(1))
    .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
    .collect::<Vec<_>>()
    .join("\n")
}
