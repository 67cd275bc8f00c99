use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::shared::constants::{SWAPPER_MODEL_NAME, SWAPPER_MODEL_URL};
use crate::shared::error::SwapError;
use crate::shared::model_cache::ModelCache;
use crate::shared::model_resolver::{ensure_available, ProgressFn};
use crate::swapping::domain::face_swapper::FaceSwapper;

use super::inswapper::OnnxInswapper;

/// Shared download progress callback, invoked as `(downloaded, total)`.
pub type SharedProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Builds a lazily loaded inswapper cache rooted at `models_dir`.
///
/// The artifact check downloads `inswapper_128.onnx` when it is missing.
/// Loading runs the same check first, so `get` also works without a prior
/// `ensure_artifact_available`.
pub fn inswapper_cache(
    models_dir: PathBuf,
    provider_names: Vec<String>,
    progress: Option<SharedProgress>,
) -> ModelCache<dyn FaceSwapper> {
    let check_dir = models_dir.clone();
    let check_progress = progress.clone();
    ModelCache::with_artifact(
        Box::new(move || {
            let path = resolve_swapper(&models_dir, progress.clone())?;
            log::info!(
                "Loading face swapper from {} (providers: {})",
                path.display(),
                provider_names.join(",")
            );
            let swapper: Arc<dyn FaceSwapper> =
                Arc::new(OnnxInswapper::new(&path, &provider_names)?);
            Ok(swapper)
        }),
        Box::new(move || resolve_swapper(&check_dir, check_progress.clone()).map(|_| ())),
    )
}

fn resolve_swapper(models_dir: &Path, progress: Option<SharedProgress>) -> Result<PathBuf, SwapError> {
    let callback = progress.map(|p| Box::new(move |done: u64, total: u64| p(done, total)) as ProgressFn);
    Ok(ensure_available(
        models_dir,
        SWAPPER_MODEL_NAME,
        SWAPPER_MODEL_URL,
        callback,
    )?)
}
