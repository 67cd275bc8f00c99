//! inswapper_128 face swapper using ONNX Runtime.
//!
//! The target face is aligned to the 128x128 ArcFace template and fed in
//! as `[0, 1]` RGB. The source identity is the normalized ArcFace embedding
//! projected through the model's embedding map, then re-normalized. The
//! generated crop is blended back over the original face.
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array4};

use crate::detection::infrastructure::execution_provider::execution_providers;
use crate::detection::infrastructure::math;
use crate::shared::error::SwapError;
use crate::shared::face::{l2_normalize, Face};
use crate::shared::frame::{Frame, CHANNELS};
use crate::swapping::domain::face_swapper::FaceSwapper;
use crate::swapping::infrastructure::onnx_initializer::read_last_initializer;
use crate::swapping::infrastructure::paste_back::paste_back;

const INPUT_SIZE: usize = 128;

pub struct OnnxInswapper {
    session: Mutex<ort::session::Session>,
    emap: Array2<f32>,
}

impl OnnxInswapper {
    pub fn new(model_path: &Path, provider_names: &[String]) -> Result<Self, SwapError> {
        let load_error = |message: String| SwapError::ModelLoad {
            path: model_path.to_path_buf(),
            message,
        };
        let emap = read_last_initializer(model_path).map_err(|e| load_error(e.to_string()))?;
        let session =
            build_session(model_path, provider_names).map_err(|e| load_error(e.to_string()))?;
        log::info!(
            "Face swapper ready ({}, emap {}x{})",
            model_path.display(),
            emap.nrows(),
            emap.ncols()
        );
        Ok(Self {
            session: Mutex::new(session),
            emap,
        })
    }

    fn run(
        &self,
        source: &Face,
        target: &Face,
        frame: &Frame,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        let transform =
            math::estimate_similarity(&target.landmarks, &math::arcface_template(INPUT_SIZE))
                .ok_or("Degenerate target landmarks")?;
        let crop = math::warp_affine(frame, &transform, INPUT_SIZE, INPUT_SIZE)
            .ok_or("Non-invertible alignment")?;

        let latent = source_latent(&source.embedding, &self.emap)?;
        let target_value = ort::value::Tensor::from_array(target_blob(&crop))?;
        let source_value = ort::value::Tensor::from_array(latent)?;

        let swapped = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| format!("Lock poisoned: {e}"))?;
            let outputs = session.run(ort::inputs![
                "target" => target_value,
                "source" => source_value
            ])?;
            let output = outputs[0].try_extract_array::<f32>()?;
            if output.shape() != [1, CHANNELS, INPUT_SIZE, INPUT_SIZE] {
                return Err(format!("Unexpected swapper output shape: {:?}", output.shape()).into());
            }
            let data = output.as_slice().ok_or("Cannot get swapper output slice")?;
            planar_to_rgb(data)
        };

        Ok(paste_back(frame, &swapped, INPUT_SIZE, &transform).unwrap_or_else(|| frame.clone()))
    }
}

fn build_session(
    model_path: &Path,
    provider_names: &[String],
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(execution_providers(provider_names))?
        .commit_from_file(model_path)?;
    Ok(session)
}

impl FaceSwapper for OnnxInswapper {
    fn swap(&self, source: &Face, target: &Face, frame: &Frame) -> Result<Frame, SwapError> {
        self.run(source, target, frame)
            .map_err(|e| SwapError::Inference(e.to_string()))
    }
}

/// Aligned RGB crop → `[1, 3, 128, 128]` tensor scaled to `[0, 1]`.
fn target_blob(crop: &[u8]) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let offset = (y * INPUT_SIZE + x) * CHANNELS;
            for c in 0..CHANNELS {
                tensor[[0, c, y, x]] = crop[offset + c] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// Normalized embedding projected through `emap`, normalized again.
fn source_latent(embedding: &[f32], emap: &Array2<f32>) -> Result<Array2<f32>, String> {
    if embedding.len() != emap.nrows() {
        return Err(format!(
            "Source embedding has {} values, swapper expects {}",
            embedding.len(),
            emap.nrows()
        ));
    }
    let mut normed = embedding.to_vec();
    l2_normalize(&mut normed);
    let row = Array2::from_shape_vec((1, normed.len()), normed).map_err(|e| e.to_string())?;
    let mut latent = row.dot(emap);
    if let Some(values) = latent.as_slice_mut() {
        l2_normalize(values);
    }
    Ok(latent)
}

/// Planar `[3, H, W]` floats in `[0, 1]` → interleaved RGB bytes.
fn planar_to_rgb(data: &[f32]) -> Vec<u8> {
    let plane = INPUT_SIZE * INPUT_SIZE;
    let mut out = vec![0u8; plane * CHANNELS];
    for i in 0..plane {
        for c in 0..CHANNELS {
            out[i * CHANNELS + c] = (data[c * plane + i] * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
