use crate::shared::error::SwapError;
use crate::shared::face::Face;
use crate::shared::frame::Frame;

/// Domain interface for face detection and identity lookup.
///
/// Implementations only need `detect_all`; the selection helpers are
/// derived from it. Shared across batch workers, hence `&self` and `Sync`.
pub trait FaceAnalyser: Send + Sync {
    /// All faces in the frame, ordered left to right by bounding box.
    fn detect_all(&self, frame: &Frame) -> Result<Vec<Face>, SwapError>;

    fn detect_one(&self, frame: &Frame) -> Result<Option<Face>, SwapError> {
        self.detect_one_at(frame, 0)
    }

    /// The face at `position` in left-to-right order, clamped to the
    /// right-most face when `position` is past the end.
    fn detect_one_at(&self, frame: &Frame, position: usize) -> Result<Option<Face>, SwapError> {
        Ok(face_at_position(self.detect_all(frame)?, position))
    }

    /// The face closest to `reference` whose distance is below `max_distance`.
    fn most_similar(
        &self,
        frame: &Frame,
        reference: &Face,
        max_distance: f64,
    ) -> Result<Option<Face>, SwapError> {
        Ok(closest_face(self.detect_all(frame)?, reference, max_distance))
    }
}

pub fn face_at_position(mut faces: Vec<Face>, position: usize) -> Option<Face> {
    if faces.is_empty() {
        return None;
    }
    let index = position.min(faces.len() - 1);
    Some(faces.swap_remove(index))
}

pub fn closest_face(faces: Vec<Face>, reference: &Face, max_distance: f64) -> Option<Face> {
    faces
        .into_iter()
        .map(|face| (face.distance(reference), face))
        .filter(|(distance, _)| *distance < max_distance)
        .min_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, face)| face)
}

/// Orders faces left to right, the order every selection helper relies on.
pub fn sort_left_to_right(faces: &mut [Face]) {
    faces.sort_by(|a, b| {
        a.left()
            .partial_cmp(&b.left())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
