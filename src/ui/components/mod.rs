mod audio_upload;
mod clip_grid;
mod input;
mod key_result;
mod text_area;

pub use audio_upload::AudioUpload;
pub use clip_grid::ClipGrid;
pub use key_result::KeyResult;
pub use text_area::TextArea;
