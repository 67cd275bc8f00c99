use std::path::PathBuf;

use thiserror::Error;

use crate::shared::model_resolver::ModelResolveError;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("model artifact unavailable: {0}")]
    ArtifactUnavailable(#[from] ModelResolveError),
    #[error("failed to load model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write image {path}: {message}")]
    ImageWrite { path: PathBuf, message: String },
    #[error("no face detected in source {0}")]
    NoSourceFace(PathBuf),
    #[error("reference frame {index} is out of range for {total} frames")]
    ReferenceFrameOutOfRange { index: usize, total: usize },
    #[error("reference face is already set")]
    ReferenceAlreadySet,
    #[error("output path {0} would overwrite an input")]
    OutputOverwritesInput(PathBuf),
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
    #[error("batch worker panicked")]
    WorkerPanicked,
}
