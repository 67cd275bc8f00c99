//! ArcFace identity embedder using ONNX Runtime.
//!
//! Faces are aligned to the 112x112 ArcFace template from their five
//! landmarks before inference; the output is L2-normalized.
use std::path::Path;
use std::sync::Mutex;

use ort::execution_providers::ExecutionProviderDispatch;

use crate::detection::infrastructure::math;
use crate::shared::face::l2_normalize;
use crate::shared::frame::{Frame, CHANNELS};

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl ArcFaceEmbedder {
    pub fn new(
        model_path: &Path,
        providers: Vec<ExecutionProviderDispatch>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(providers)?
            .commit_from_file(model_path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Normalized embedding of the face described by `landmarks`.
    pub fn embed(
        &self,
        frame: &Frame,
        landmarks: &[(f64, f64); 5],
    ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let transform = math::estimate_similarity(landmarks, &math::arcface_template(INPUT_SIZE))
            .ok_or("Degenerate face landmarks")?;
        let crop = math::warp_affine(frame, &transform, INPUT_SIZE, INPUT_SIZE)
            .ok_or("Non-invertible alignment")?;

        let input_value = ort::value::Tensor::from_array(preprocess(&crop))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

/// Aligned 112x112 RGB crop → normalized NCHW tensor.
fn preprocess(crop: &[u8]) -> ndarray::Array4<f32> {
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let offset = (y * INPUT_SIZE + x) * CHANNELS;
            for c in 0..CHANNELS {
                tensor[[0, c, y, x]] = (crop[offset + c] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}
