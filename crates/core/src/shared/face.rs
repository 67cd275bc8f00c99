/// A detected face: location, five landmarks, and identity embedding.
///
/// Landmark order is left eye, right eye, nose, left mouth corner,
/// right mouth corner, in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    /// `[x1, y1, x2, y2]` in frame pixels.
    pub bbox: [f64; 4],
    pub landmarks: [(f64, f64); 5],
    pub score: f64,
    /// L2-normalized identity embedding.
    pub embedding: Vec<f32>,
}

impl Face {
    pub fn left(&self) -> f64 {
        self.bbox[0]
    }

    /// Squared Euclidean distance between the two normalized embeddings.
    ///
    /// Ranges from 0.0 (same direction) to 4.0 (opposite). Embeddings of
    /// different length are never considered close.
    pub fn distance(&self, other: &Face) -> f64 {
        if self.embedding.len() != other.embedding.len() || self.embedding.is_empty() {
            return f64::INFINITY;
        }
        self.embedding
            .iter()
            .zip(other.embedding.iter())
            .map(|(a, b)| {
                let d = (*a as f64) - (*b as f64);
                d * d
            })
            .sum()
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
