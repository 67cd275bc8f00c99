use std::sync::{Arc, RwLock};

use crate::shared::error::SwapError;

/// Constructs the cached model. Called at most once per load cycle.
pub type ModelLoader<M> = Box<dyn Fn() -> Result<Arc<M>, SwapError> + Send + Sync>;

/// Makes sure the model's on-disk artifact exists, fetching it if needed.
pub type ArtifactCheck = Box<dyn Fn() -> Result<(), SwapError> + Send + Sync>;

/// Lazily constructed, clearable handle to an expensive model.
///
/// `get` uses double-checked locking: the fast path takes a shared read
/// lock; on a miss the caller takes the write lock and checks again before
/// constructing, so concurrent first callers build exactly one instance.
///
/// `clear` is not coordinated with in-flight `get` calls. Callers must
/// only clear once no other thread is using or fetching the model.
pub struct ModelCache<M: ?Sized> {
    slot: RwLock<Option<Arc<M>>>,
    loader: ModelLoader<M>,
    artifact: Option<ArtifactCheck>,
}

impl<M: ?Sized> ModelCache<M> {
    pub fn new(loader: ModelLoader<M>) -> Self {
        Self {
            slot: RwLock::new(None),
            loader,
            artifact: None,
        }
    }

    pub fn with_artifact(loader: ModelLoader<M>, artifact: ArtifactCheck) -> Self {
        Self {
            slot: RwLock::new(None),
            loader,
            artifact: Some(artifact),
        }
    }

    /// Runs the artifact check, if any. Does not load the model.
    pub fn ensure_artifact_available(&self) -> Result<(), SwapError> {
        match &self.artifact {
            Some(check) => check(),
            None => Ok(()),
        }
    }

    pub fn get(&self) -> Result<Arc<M>, SwapError> {
        {
            let slot = self
                .slot
                .read()
                .map_err(|_| SwapError::LockPoisoned("model cache"))?;
            if let Some(model) = slot.as_ref() {
                return Ok(Arc::clone(model));
            }
        }

        let mut slot = self
            .slot
            .write()
            .map_err(|_| SwapError::LockPoisoned("model cache"))?;
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = (self.loader)()?;
        log::info!("Model loaded");
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    pub fn clear(&self) {
        // A poisoned slot only means a loader panicked; resetting is still sound.
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.take().is_some() {
            log::debug!("Model released");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().map(|s| s.is_some()).unwrap_or(false)
    }
}
