use crate::shared::geometry::{NormalizedRect, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Visual style of an overlay: a colored outline over a transparent fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub stroke: Color,
    pub stroke_width: f32,
    pub fill: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke: Color::GREEN,
            stroke_width: 2.0,
            fill: Color::TRANSPARENT,
        }
    }
}

/// One drawn face box in view space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayShape {
    pub rect: Rect,
    pub style: OverlayStyle,
    /// The detector rectangle this shape was mapped from.
    pub source: NormalizedRect,
}
