use chrono::{DateTime, NaiveDateTime};

/// Truncate to at most `max_len` chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Clip duration in seconds with one decimal, e.g. "12.3s"
pub fn format_duration(seconds: f64) -> String {
  format!("{:.1}s", seconds)
}

/// Calendar date of a backend timestamp.
///
/// The backend sends RFC 3339 or naive ISO 8601 (no offset); anything else
/// is shown as received.
pub fn format_date(timestamp: &str) -> String {
  if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
    return dt.format("%Y-%m-%d").to_string();
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
    return dt.format("%Y-%m-%d").to_string();
  }
  timestamp.to_string()
}

/// Date and time of a backend timestamp, for "last updated" lines
pub fn format_timestamp(timestamp: &str) -> String {
  if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
    return dt.format("%Y-%m-%d %H:%M").to_string();
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
    return dt.format("%Y-%m-%d %H:%M").to_string();
  }
  timestamp.to_string()
}
