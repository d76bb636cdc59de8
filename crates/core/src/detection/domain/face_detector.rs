use crate::detection::domain::orientation::ImageOrientation;
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedRect;

/// One detected face. No identity: faces are not tracked across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectedFace {
    /// Bounds in the oriented image, normalized to `[0, 1]`.
    pub bounds: NormalizedRect,
    pub confidence: f32,
}

/// Domain interface for face detection.
///
/// The detector interprets `frame` through `orientation` and reports faces
/// in the upright image space. Implementations may keep inference state,
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        orientation: ImageOrientation,
    ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>>;
}
