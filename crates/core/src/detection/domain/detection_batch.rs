use crate::detection::domain::face_detector::DetectedFace;

/// Outcome of running the detector on one frame.
///
/// `Faces` is never empty; an empty detector result or a detector error
/// both collapse into `NoFaces`.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionBatch {
    Faces(Vec<DetectedFace>),
    NoFaces,
}

impl DetectionBatch {
    pub fn from_faces(faces: Vec<DetectedFace>) -> Self {
        if faces.is_empty() {
            DetectionBatch::NoFaces
        } else {
            DetectionBatch::Faces(faces)
        }
    }

    /// Best-effort conversion: detector failures are logged and treated as
    /// "no faces".
    pub fn from_result(result: Result<Vec<DetectedFace>, Box<dyn std::error::Error>>) -> Self {
        match result {
            Ok(faces) => Self::from_faces(faces),
            Err(e) => {
                log::debug!("Face detection failed, clearing overlays: {e}");
                DetectionBatch::NoFaces
            }
        }
    }

    pub fn faces(&self) -> &[DetectedFace] {
        match self {
            DetectionBatch::Faces(faces) => faces,
            DetectionBatch::NoFaces => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.faces().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DetectionBatch::NoFaces)
    }
}
