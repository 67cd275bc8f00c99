use std::path::PathBuf;

use crate::shared::error::SwapError;

/// Per-frame progress callback. Called once for every processed frame.
pub type FrameUpdate<'a> = dyn Fn() + Sync + 'a;

/// Processes one batch of frame paths, calling the update once per frame.
pub type BatchFn<'a> = dyn Fn(&[PathBuf], &FrameUpdate<'_>) -> Result<(), SwapError> + Sync + 'a;

/// Abstracts how a frame sequence is split and scheduled.
///
/// This is a port (application-layer interface). Infrastructure provides
/// the concrete scheduling (e.g. a worker pool).
pub trait FrameBatchExecutor: Send + Sync {
    /// Runs `process` over `frame_paths`, partitioned into batches. Every
    /// path belongs to exactly one batch. Returns the first batch error.
    fn execute(&self, frame_paths: &[PathBuf], process: &BatchFn<'_>) -> Result<(), SwapError>;
}
