use crate::shared::error::SwapError;
use crate::shared::face::Face;
use crate::shared::frame::Frame;

/// Replaces the identity of `target` in `frame` with that of `source`.
///
/// Returns a new frame; pixels outside the target face footprint are
/// left untouched. Implementations must be shareable across batch workers.
pub trait FaceSwapper: Send + Sync {
    fn swap(&self, source: &Face, target: &Face, frame: &Frame) -> Result<Frame, SwapError>;
}
