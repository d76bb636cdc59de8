use iced::mouse;
use iced::widget::canvas::{self, Frame, Path, Stroke};
use iced::{Element, Length, Point, Rectangle, Renderer, Size, Theme};

use facelens_core::overlay::domain::overlay_set::OverlaySet;
use facelens_core::overlay::domain::overlay_shape::Color;
use facelens_core::overlay::domain::viewport::Viewport;
use facelens_core::shared::geometry::{Rect, Size as ViewSize};

/// Draws the current overlay set.
///
/// Shapes are re-mapped onto the canvas's actual bounds, so a window that
/// opened at another size than requested still lines up.
struct OverlayCanvas<'a> {
    overlays: &'a OverlaySet,
    viewport: Option<Viewport>,
}

impl<Message> canvas::Program<Message> for OverlayCanvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());

        let view = ViewSize::new(bounds.width, bounds.height);
        let rects = view_rects(self.overlays, self.viewport, view);

        for (shape, rect) in self.overlays.iter().zip(rects) {
            let path = Path::rectangle(
                Point::new(rect.x, rect.y),
                Size::new(rect.width, rect.height),
            );
            if shape.style.fill.a > 0 {
                frame.fill(&path, to_iced(shape.style.fill));
            }
            frame.stroke(
                &path,
                Stroke::default()
                    .with_width(shape.style.stroke_width)
                    .with_color(to_iced(shape.style.stroke)),
            );
        }

        vec![frame.into_geometry()]
    }
}

pub fn overlay_canvas<'a, Message: 'a>(
    overlays: &'a OverlaySet,
    viewport: Option<Viewport>,
) -> Element<'a, Message> {
    canvas::Canvas::new(OverlayCanvas { overlays, viewport })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Shape rects for a canvas of size `view`. Without a viewport the stored
/// rects are used as they are.
fn view_rects(overlays: &OverlaySet, viewport: Option<Viewport>, view: ViewSize) -> Vec<Rect> {
    match viewport {
        Some(viewport) if viewport.view != view => {
            let viewport = viewport.with_view(view);
            overlays.iter().map(|s| viewport.map_rect(&s.source)).collect()
        }
        _ => overlays.iter().map(|s| s.rect).collect(),
    }
}

fn to_iced(color: Color) -> iced::Color {
    iced::Color::from_rgba8(color.r, color.g, color.b, color.a as f32 / 255.0)
}
