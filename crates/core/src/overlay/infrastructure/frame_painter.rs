use image::{ImageBuffer, Rgb, Rgba};
use imageproc::drawing::{draw_hollow_rect_mut, Canvas};
use imageproc::rect::Rect as PixelRect;

use crate::overlay::domain::overlay_shape::{Color, OverlayShape};
use crate::shared::frame::{Frame, PixelFormat};

/// Strokes overlay outlines into the frame's pixels.
///
/// Shape rectangles must be in the frame's pixel space (see
/// `Viewport::identity`). The stroke is drawn inside the rectangle and
/// clipped to the frame. Fills are not painted, the interior keeps the
/// camera image.
pub fn paint_overlays(frame: &mut Frame, shapes: &[OverlayShape]) {
    let (width, height) = (frame.width(), frame.height());
    match frame.format() {
        PixelFormat::Rgb8 => {
            match ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, frame.data_mut()) {
                Some(mut canvas) => stroke_shapes(&mut canvas, shapes, |c| Rgb([c.r, c.g, c.b])),
                None => log::warn!("Frame buffer is not {width}x{height} RGB, overlays skipped"),
            }
        }
        // BGRA bytes viewed as RGBA, so the color goes in swapped.
        PixelFormat::Bgra8 => {
            match ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, frame.data_mut()) {
                Some(mut canvas) => {
                    stroke_shapes(&mut canvas, shapes, |c| Rgba([c.b, c.g, c.r, 255]))
                }
                None => log::warn!("Frame buffer is not {width}x{height} BGRA, overlays skipped"),
            }
        }
    }
}

/// Draws `stroke_width` nested hollow rectangles per shape.
fn stroke_shapes<C: Canvas>(
    canvas: &mut C,
    shapes: &[OverlayShape],
    pixel: impl Fn(Color) -> C::Pixel,
) {
    let (fw, fh) = canvas.dimensions();
    let (fw, fh) = (fw as i64, fh as i64);

    for shape in shapes {
        let stroke = (shape.style.stroke_width.round() as i64).max(1);
        let mut left = shape.rect.x.round() as i64;
        let mut top = shape.rect.y.round() as i64;
        let mut right = shape.rect.right().round() as i64;
        let mut bottom = shape.rect.bottom().round() as i64;
        if right <= 0 || bottom <= 0 || left >= fw || top >= fh {
            continue;
        }

        // Pull far-away edges in, but never onto the frame.
        left = left.max(-stroke);
        top = top.max(-stroke);
        right = right.min(fw + stroke);
        bottom = bottom.min(fh + stroke);

        let color = pixel(shape.style.stroke);
        for inset in 0..stroke {
            let w = right - left - 2 * inset;
            let h = bottom - top - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = PixelRect::at((left + inset) as i32, (top + inset) as i32)
                .of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::domain::overlay_shape::OverlayStyle;
    use crate::shared::frame::PixelFormat;
    use crate::shared::geometry::{NormalizedRect, Rect};

    fn black(width: u32, height: u32, format: PixelFormat) -> Frame {
        let len = (width * height) as usize * format.channels() as usize;
        Frame::new(vec![0; len], width, height, format, 0)
    }

    fn shape(x: f32, y: f32, w: f32, h: f32, stroke_width: f32) -> OverlayShape {
        OverlayShape {
            rect: Rect::new(x, y, w, h),
            style: OverlayStyle {
                stroke_width,
                ..OverlayStyle::default()
            },
            source: NormalizedRect::default(),
        }
    }

    #[test]
    fn test_paints_outline_but_not_interior() {
        let mut frame = black(10, 10, PixelFormat::Rgb8);
        paint_overlays(&mut frame, &[shape(2.0, 2.0, 6.0, 6.0, 1.0)]);

        assert_eq!(frame.rgb_at(2, 2), [0, 255, 0]); // corner
        assert_eq!(frame.rgb_at(5, 7), [0, 255, 0]); // bottom edge
        assert_eq!(frame.rgb_at(7, 4), [0, 255, 0]); // right edge
        assert_eq!(frame.rgb_at(5, 5), [0, 0, 0]); // interior
        assert_eq!(frame.rgb_at(1, 1), [0, 0, 0]); // outside
    }

    #[test]
    fn test_stroke_width_thickens_edges() {
        let mut frame = black(12, 12, PixelFormat::Rgb8);
        paint_overlays(&mut frame, &[shape(0.0, 0.0, 12.0, 12.0, 3.0)]);
        assert_eq!(frame.rgb_at(6, 2), [0, 255, 0]);
        assert_eq!(frame.rgb_at(6, 3), [0, 0, 0]);
    }

    #[test]
    fn test_bgra_frames_get_green_in_bgra_layout() {
        let mut frame = black(4, 4, PixelFormat::Bgra8);
        paint_overlays(&mut frame, &[shape(0.0, 0.0, 4.0, 4.0, 1.0)]);
        assert_eq!(&frame.data()[0..4], &[0, 255, 0, 255]);
    }

    #[test]
    fn test_shape_off_frame_is_clipped() {
        let mut frame = black(6, 6, PixelFormat::Rgb8);
        paint_overlays(&mut frame, &[shape(-3.0, -3.0, 6.0, 6.0, 1.0)]);
        // only the right and bottom edges are visible
        assert_eq!(frame.rgb_at(2, 0), [0, 255, 0]);
        assert_eq!(frame.rgb_at(0, 2), [0, 255, 0]);
        assert_eq!(frame.rgb_at(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_fully_outside_shape_is_ignored() {
        let mut frame = black(4, 4, PixelFormat::Rgb8);
        paint_overlays(&mut frame, &[shape(10.0, 10.0, 5.0, 5.0, 1.0)]);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_far_off_frame_box_keeps_only_visible_edges() {
        let mut frame = black(8, 8, PixelFormat::Rgb8);
        paint_overlays(&mut frame, &[shape(-1.0e6, 0.0, 1.0e6 + 5.0, 8.0, 2.0)]);
        assert_eq!(frame.rgb_at(0, 0), [0, 255, 0]); // top edge
        assert_eq!(frame.rgb_at(4, 4), [0, 255, 0]); // right edge
        assert_eq!(frame.rgb_at(3, 4), [0, 255, 0]); // right edge, inner ring
        assert_eq!(frame.rgb_at(0, 4), [0, 0, 0]); // no left edge on the frame
    }

    #[test]
    fn test_fill_is_not_painted() {
        let mut frame = black(10, 10, PixelFormat::Rgb8);
        let mut filled = shape(1.0, 1.0, 8.0, 8.0, 1.0);
        filled.style.fill = Color::rgb(255, 0, 0);
        paint_overlays(&mut frame, &[filled]);
        assert_eq!(frame.rgb_at(4, 4), [0, 0, 0]);
    }
}
