use std::path::Path;

use crate::shared::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// True if `path` is an existing file with an image extension.
pub fn is_image(path: &Path) -> bool {
    path.is_file() && has_extension(path, IMAGE_EXTENSIONS)
}

/// True if `path` is an existing file with a video extension.
pub fn is_video(path: &Path) -> bool {
    path.is_file() && has_extension(path, VIDEO_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
