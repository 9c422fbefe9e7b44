//! Reads and writes as views use them: each read bound to its cache key, and
//! each mutation bound to its cache effect.

use std::path::PathBuf;
use tracing::info;

use super::client::ApiClient;
use super::error::ApiError;
use super::keys;
use super::types::{AudioFile, Lyrics, Project, SourceClip};
use crate::query::{Mutation, Query, QueryClient};

pub fn projects(queries: &QueryClient, api: &ApiClient) -> Query<Vec<Project>> {
  let api = api.clone();
  Query::new(queries, keys::projects(), move || {
    let api = api.clone();
    async move { api.list_projects().await }
  })
}

/// Disabled when `project_id` is empty
pub fn project(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Query<Project> {
  if project_id.is_empty() {
    return Query::disabled(queries, keys::project(project_id));
  }

  let api = api.clone();
  let id = project_id.to_string();
  Query::new(queries, keys::project(project_id), move || {
    let api = api.clone();
    let id = id.clone();
    async move { api.get_project(&id).await }
  })
}

pub fn source_clips(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Query<Vec<SourceClip>> {
  let api = api.clone();
  let id = project_id.to_string();
  Query::new(queries, keys::source_clips(project_id), move || {
    let api = api.clone();
    let id = id.clone();
    async move { api.list_source_clips(&id).await }
  })
}

pub fn lyrics(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Query<Lyrics> {
  let api = api.clone();
  let id = project_id.to_string();
  Query::new(queries, keys::lyrics(project_id), move || {
    let api = api.clone();
    let id = id.clone();
    async move { api.get_lyrics(&id).await }
  })
}

/// Replace the lyrics text; the stored lyrics the server returns become the
/// cached value of the lyrics key (no refetch). A 204 reply leaves the cache
/// as it was.
pub fn save_lyrics(
  queries: &QueryClient,
  api: &ApiClient,
  project_id: &str,
) -> Mutation<String, Option<Lyrics>> {
  let api = api.clone();
  let id = project_id.to_string();
  let key = keys::lyrics(project_id);

  Mutation::new(queries, move |raw_text: String| {
    let api = api.clone();
    let id = id.clone();
    async move {
      info!(project_id = %id, chars = raw_text.chars().count(), "saving lyrics");
      api.replace_lyrics(&id, &Lyrics::new(raw_text)).await
    }
  })
  .on_success(move |queries, saved: &Option<Lyrics>| {
    if let Some(saved) = saved {
      queries.set_query_data(key.clone(), saved.clone());
    }
  })
}

pub const NO_FILE_SELECTED: &str = "Please select an audio file to upload.";

/// Upload the file at the given path; on success the project's source clips
/// are invalidated so they refetch.
pub fn upload_audio(
  queries: &QueryClient,
  api: &ApiClient,
  project_id: &str,
) -> Mutation<Option<PathBuf>, ()> {
  let api = api.clone();
  let id = project_id.to_string();
  let key = keys::source_clips(project_id);

  Mutation::new(queries, move |path: Option<PathBuf>| {
    let api = api.clone();
    let id = id.clone();
    async move {
      let path = path.ok_or_else(|| ApiError::Input(NO_FILE_SELECTED.to_string()))?;
      let file = AudioFile::read(&path)
        .await
        .map_err(|e| ApiError::Input(format!("Failed to read {}: {}", path.display(), e)))?;

      info!(project_id = %id, file = %path.display(), "uploading audio");
      api.upload_audio(&id, file).await
    }
  })
  .on_success(move |queries, _: &()| {
    queries.invalidate(&key);
  })
}
