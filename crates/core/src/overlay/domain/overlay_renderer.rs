use crate::detection::domain::detection_batch::DetectionBatch;
use crate::overlay::domain::overlay_set::OverlaySet;
use crate::overlay::domain::overlay_shape::{OverlayShape, OverlayStyle};
use crate::overlay::domain::viewport::Viewport;
use crate::shared::geometry::NormalizedRect;

/// Turns detection batches into the on-screen overlay set.
///
/// Every update replaces the full set: no diffing, no animation and no
/// per-face identity across frames. Owned by the UI side, which is the only
/// place overlays are mutated.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
    overlays: OverlaySet,
    viewport: Option<Viewport>,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            style,
            overlays: OverlaySet::new(),
            viewport: None,
        }
    }

    /// Replaces the overlays with one stroked box per face in `batch`,
    /// mapped through `viewport`. `NoFaces` clears the overlays.
    pub fn update(&mut self, batch: &DetectionBatch, viewport: Viewport) -> &OverlaySet {
        self.viewport = Some(viewport);
        match batch {
            DetectionBatch::Faces(faces) => {
                let shapes = faces
                    .iter()
                    .map(|face| self.shape_for(&face.bounds, &viewport))
                    .collect();
                self.overlays.replace(shapes);
            }
            DetectionBatch::NoFaces => {
                self.overlays.clear();
            }
        }
        &self.overlays
    }

    /// Re-maps the current overlays after a layout change.
    pub fn relayout(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        let shapes = self
            .overlays
            .iter()
            .map(|shape| self.shape_for(&shape.source, &viewport))
            .collect();
        self.overlays.replace(shapes);
    }

    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn style(&self) -> OverlayStyle {
        self.style
    }

    fn shape_for(&self, source: &NormalizedRect, viewport: &Viewport) -> OverlayShape {
        OverlayShape {
            rect: viewport.map_rect(source),
            style: self.style,
            source: *source,
        }
    }
}
