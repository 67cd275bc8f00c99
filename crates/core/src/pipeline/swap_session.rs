use std::sync::{Arc, RwLock};

use crate::detection::domain::face_analyser::FaceAnalyser;
use crate::shared::config::SwapConfig;
use crate::shared::error::SwapError;
use crate::shared::face::Face;
use crate::shared::model_cache::ModelCache;
use crate::swapping::domain::face_swapper::FaceSwapper;

/// State that lives for one swap run: configuration, the lazily loaded swap
/// model, and the reference face used in single-face mode.
///
/// One active run per session. The reference is read by many batch workers
/// and written only before iteration starts.
pub struct SwapSession {
    config: SwapConfig,
    analyser: Arc<dyn FaceAnalyser>,
    swapper: ModelCache<dyn FaceSwapper>,
    reference_face: RwLock<Option<Face>>,
}

impl SwapSession {
    pub fn open(
        config: SwapConfig,
        analyser: Arc<dyn FaceAnalyser>,
        swapper: ModelCache<dyn FaceSwapper>,
    ) -> Self {
        log::debug!(
            "Swap session opened (many_faces={}, threads={})",
            config.many_faces,
            config.execution_threads
        );
        Self {
            config,
            analyser,
            swapper,
            reference_face: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn analyser(&self) -> &dyn FaceAnalyser {
        self.analyser.as_ref()
    }

    /// Makes sure the swap model artifact is on disk without loading it.
    pub fn ensure_swapper_available(&self) -> Result<(), SwapError> {
        self.swapper.ensure_artifact_available()
    }

    /// The shared swap model, loaded on first use.
    pub fn swapper(&self) -> Result<Arc<dyn FaceSwapper>, SwapError> {
        self.swapper.get()
    }

    pub fn clear_swapper(&self) {
        self.swapper.clear();
    }

    pub fn is_swapper_loaded(&self) -> bool {
        self.swapper.is_loaded()
    }

    pub fn reference_face(&self) -> Result<Option<Face>, SwapError> {
        self.reference_face
            .read()
            .map(|r| r.clone())
            .map_err(|_| SwapError::LockPoisoned("reference face"))
    }

    /// Sets the reference face. A reference stays fixed until cleared, so a
    /// second set fails with `ReferenceAlreadySet` and keeps the first one.
    pub fn set_reference_face(&self, face: Face) -> Result<(), SwapError> {
        let mut slot = self
            .reference_face
            .write()
            .map_err(|_| SwapError::LockPoisoned("reference face"))?;
        if slot.is_some() {
            return Err(SwapError::ReferenceAlreadySet);
        }
        *slot = Some(face);
        Ok(())
    }

    pub fn clear_reference_face(&self) {
        let mut slot = match self.reference_face.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }

    /// Releases the model and forgets the reference face.
    pub fn close(self) {
        self.clear_swapper();
        self.clear_reference_face();
        log::debug!("Swap session closed");
    }
}
