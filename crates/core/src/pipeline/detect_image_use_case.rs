use std::path::Path;

use crate::capture::domain::capture_source::CaptureSource;
use crate::detection::domain::detection_batch::DetectionBatch;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::orientation::ImageOrientation;
use crate::overlay::domain::image_writer::ImageWriter;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::domain::overlay_shape::{OverlayShape, OverlayStyle};
use crate::overlay::domain::viewport::Viewport;
use crate::overlay::infrastructure::frame_painter::paint_overlays;
use crate::shared::geometry::Size;

/// Result of a single-image run. Shapes are in oriented image pixels.
#[derive(Clone, Debug)]
pub struct ImageDetection {
    pub width: u32,
    pub height: u32,
    pub batch: DetectionBatch,
    pub shapes: Vec<OverlayShape>,
}

/// Single-image pipeline: read → detect → overlay → (paint → write).
pub struct DetectImageUseCase {
    image_writer: Box<dyn ImageWriter>,
    detector: Box<dyn FaceDetector>,
    renderer: OverlayRenderer,
    orientation: ImageOrientation,
}

impl DetectImageUseCase {
    pub fn new(
        image_writer: Box<dyn ImageWriter>,
        detector: Box<dyn FaceDetector>,
        style: OverlayStyle,
        orientation: ImageOrientation,
    ) -> Self {
        Self {
            image_writer,
            detector,
            renderer: OverlayRenderer::new(style),
            orientation,
        }
    }

    /// Detects faces in the first frame of `source`. When `output_path` is
    /// given, the oriented image is written there with the overlays painted.
    ///
    /// Unlike the live pipeline, detector errors are returned.
    pub fn execute(
        &mut self,
        source: &mut dyn CaptureSource,
        output_path: Option<&Path>,
    ) -> Result<ImageDetection, Box<dyn std::error::Error>> {
        source.open()?;
        let frame = source.next_frame()?.ok_or("No frames in image")?;
        source.close();

        let faces = self.detector.detect(&frame, self.orientation)?;
        let batch = DetectionBatch::from_faces(faces);

        let mut oriented = self.orientation.apply(&frame);
        let image = Size::new(oriented.width() as f32, oriented.height() as f32);
        let shapes = self
            .renderer
            .update(&batch, Viewport::identity(image))
            .shapes()
            .to_vec();
        log::debug!("Detected {} face(s) in frame {}", batch.len(), frame.index());

        if let Some(path) = output_path {
            paint_overlays(&mut oriented, &shapes);
            self.image_writer.write(path, &oriented)?;
        }

        Ok(ImageDetection {
            width: oriented.width(),
            height: oriented.height(),
            batch,
            shapes,
        })
    }
}
