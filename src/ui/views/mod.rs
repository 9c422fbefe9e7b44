mod lyrics_editor;
mod project_detail;
mod project_list;

pub use lyrics_editor::LyricsEditorView;
pub use project_detail::ProjectDetailView;
pub use project_list::ProjectListView;
