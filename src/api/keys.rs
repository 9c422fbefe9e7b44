//! Cache keys for every read. Project-scoped keys always carry the project
//! id, so entries of different projects never collide.

use crate::query::QueryKey;
use crate::query_key;

pub fn projects() -> QueryKey {
  query_key!["projects"]
}

pub fn project(project_id: &str) -> QueryKey {
  query_key!["projects", project_id]
}

pub fn source_clips(project_id: &str) -> QueryKey {
  query_key!["projects", project_id, "source-clips"]
}

pub fn lyrics(project_id: &str) -> QueryKey {
  query_key!["projects", project_id, "lyrics"]
}
