use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::constants::DEFAULT_SIMILAR_FACE_DISTANCE;
use crate::shared::model_resolver::{self, ModelResolveError};

/// Run-wide settings for a face swap session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Replace every detected face instead of tracking one identity.
    pub many_faces: bool,
    /// Left-to-right index of the face used as reference (image target and
    /// video anchor frame).
    pub reference_face_position: usize,
    /// Index of the video frame the reference face is taken from.
    pub reference_frame_number: usize,
    pub similar_face_distance: f64,
    pub detection_confidence: f64,
    /// Ordered execution backend names, e.g. `["cuda", "cpu"]`.
    pub execution_providers: Vec<String>,
    pub execution_threads: usize,
    pub models_dir: Option<PathBuf>,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            many_faces: false,
            reference_face_position: 0,
            reference_frame_number: 0,
            similar_face_distance: DEFAULT_SIMILAR_FACE_DISTANCE,
            detection_confidence: 0.5,
            execution_providers: vec!["cpu".to_string()],
            execution_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            models_dir: None,
        }
    }
}

impl SwapConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceSwap").join("config.json"))
    }

    /// Loads the user config, falling back to defaults when missing or malformed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.similar_face_distance.is_finite() || self.similar_face_distance <= 0.0 {
            return Err(format!(
                "Similar face distance must be a positive number, got {}",
                self.similar_face_distance
            ));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            ));
        }
        if self.execution_threads == 0 {
            return Err("Execution threads must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn resolved_models_dir(&self) -> Result<PathBuf, ModelResolveError> {
        match &self.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => model_resolver::default_models_dir(),
        }
    }
}
