//! Records mirrored from the Beatmatchr backend.
//!
//! The backend owns the lifecycle of all of these; the editor only reads them
//! (and replaces lyrics text). Fields the backend may add later are ignored.

use serde::{Deserialize, Serialize};

/// Top-level container for a user's audio work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  /// ISO-8601, as sent by the server
  #[serde(default)]
  pub created_at: Option<String>,
}

/// Audio segment derived from (or attached to) a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceClip {
  pub id: String,
  pub name: String,
  /// Seconds
  #[serde(default)]
  pub duration: Option<f64>,
  #[serde(default)]
  pub waveform_url: Option<String>,
}

/// The single lyrics document of a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lyrics {
  #[serde(default)]
  pub raw_text: String,
  #[serde(default)]
  pub updated_at: Option<String>,
  #[serde(default)]
  pub project_id: Option<String>,
  /// Where the text came from (e.g. "transcription", "manual")
  #[serde(default)]
  pub source: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
}

impl Lyrics {
  pub fn new(raw_text: impl Into<String>) -> Self {
    Self {
      raw_text: raw_text.into(),
      ..Self::default()
    }
  }
}

/// Body of a lyrics replace. Only the text is sent; the server stamps the rest.
#[derive(Debug, Serialize)]
pub(crate) struct LyricsUpdate<'a> {
  pub raw_text: &'a str,
}

/// An audio file selected for upload
#[derive(Debug, Clone)]
pub struct AudioFile {
  pub file_name: String,
  pub content_type: &'static str,
  pub bytes: Vec<u8>,
}

impl AudioFile {
  pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
    let file_name = file_name.into();
    let content_type = content_type_for(&file_name);
    Self {
      file_name,
      content_type,
      bytes,
    }
  }

  /// Read a file from disk. Contents are not inspected.
  pub async fn read(path: &std::path::Path) -> std::io::Result<Self> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "audio".to_string());
    Ok(Self::new(file_name, bytes))
  }
}

/// Guess a content type from the file extension
fn content_type_for(file_name: &str) -> &'static str {
  let ext = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();

  match ext.as_str() {
    "mp3" => "audio/mpeg",
    "wav" => "audio/wav",
    "flac" => "audio/flac",
    "ogg" | "oga" | "opus" => "audio/ogg",
    "m4a" | "mp4" => "audio/mp4",
    "aac" => "audio/aac",
    "webm" => "audio/webm",
    _ => "application/octet-stream",
  }
}
