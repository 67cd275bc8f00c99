use std::path::Path;

use crate::shared::error::SwapError;
use crate::shared::frame::Frame;

/// Writes a single frame to an image file.
pub trait ImageWriter: Send + Sync {
    /// Writes `frame` to `path`, replacing any existing file. The format
    /// follows the path's extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), SwapError>;
}
