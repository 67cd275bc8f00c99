use std::path::Path;

use crate::shared::error::SwapError;
use crate::shared::frame::Frame;

/// Decodes an image file into an RGB frame.
pub trait FrameReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Frame, SwapError>;
}
