use crate::detection::domain::face_analyser::FaceAnalyser;
use crate::shared::error::SwapError;
use crate::shared::face::Face;
use crate::shared::frame::Frame;

/// How target faces are chosen in each frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection<'a> {
    /// Every detected face is a target.
    AllFaces,
    /// At most one target: the face most similar to the reference.
    Similar { reference: &'a Face, max_distance: f64 },
    /// Single-face mode without a reference; nothing is replaced.
    Nothing,
}

impl<'a> Selection<'a> {
    pub fn new(many_faces: bool, reference: Option<&'a Face>, max_distance: f64) -> Self {
        match (many_faces, reference) {
            (true, _) => Selection::AllFaces,
            (false, Some(reference)) => Selection::Similar {
                reference,
                max_distance,
            },
            (false, None) => Selection::Nothing,
        }
    }

    /// Faces to replace in `frame`, left to right.
    pub fn targets(&self, analyser: &dyn FaceAnalyser, frame: &Frame) -> Result<Vec<Face>, SwapError> {
        match self {
            Selection::AllFaces => analyser.detect_all(frame),
            Selection::Similar {
                reference,
                max_distance,
            } => Ok(analyser
                .most_similar(frame, reference, *max_distance)?
                .into_iter()
                .collect()),
            Selection::Nothing => Ok(Vec::new()),
        }
    }
}
