use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_analyser::{sort_left_to_right, FaceAnalyser};
use crate::detection::infrastructure::arcface_embedder::ArcFaceEmbedder;
use crate::detection::infrastructure::execution_provider::execution_providers;
use crate::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use crate::shared::error::SwapError;
use crate::shared::face::Face;
use crate::shared::frame::Frame;

/// Face analyser built from a YOLO-pose detector and an ArcFace embedder.
///
/// Detections without keypoints cannot be aligned and are dropped.
pub struct OnnxFaceAnalyser {
    detector: Mutex<OnnxYoloDetector>,
    embedder: ArcFaceEmbedder,
}

impl OnnxFaceAnalyser {
    pub fn new(
        detector_path: &Path,
        embedder_path: &Path,
        provider_names: &[String],
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let detector = OnnxYoloDetector::new(
            detector_path,
            execution_providers(provider_names),
            confidence,
        )?;
        let embedder = ArcFaceEmbedder::new(embedder_path, execution_providers(provider_names))?;
        log::info!(
            "Face analyser ready ({}, {})",
            detector_path.display(),
            embedder_path.display()
        );
        Ok(Self {
            detector: Mutex::new(detector),
            embedder,
        })
    }

    fn analyse(&self, frame: &Frame) -> Result<Vec<Face>, Box<dyn std::error::Error>> {
        let detections = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|e| format!("Lock poisoned: {e}"))?;
            detector.detect(frame)?
        };

        let mut faces = Vec::with_capacity(detections.len());
        for det in detections {
            let Some(landmarks) = det.keypoints else {
                continue;
            };
            let embedding = self.embedder.embed(frame, &landmarks)?;
            faces.push(Face {
                bbox: det.bbox,
                landmarks,
                score: det.score,
                embedding,
            });
        }
        sort_left_to_right(&mut faces);
        log::debug!("Detected {} face(s)", faces.len());
        Ok(faces)
    }
}

impl FaceAnalyser for OnnxFaceAnalyser {
    fn detect_all(&self, frame: &Frame) -> Result<Vec<Face>, SwapError> {
        self.analyse(frame)
            .map_err(|e| SwapError::Inference(e.to_string()))
    }
}
