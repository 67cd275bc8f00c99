use std::path::Path;

use crate::shared::error::SwapError;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), SwapError> {
        let write_error = |message: String| SwapError::ImageWrite {
            path: path.to_path_buf(),
            message,
        };

        // Ensure parent directory exists (infrastructure concern)
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or_else(|| write_error("Failed to create image from frame data".into()))?;
        img.save(path).map_err(|e| write_error(e.to_string()))?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
