use std::fmt;
use std::str::FromStr;

use crate::shared::geometry::{NormalizedRect, Rect, Size};

/// How the preview image is fitted into its view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VideoGravity {
    /// Stretch to the view's size, ignoring aspect ratio.
    Resize,
    /// Scale uniformly to fit inside the view (letterboxed).
    ResizeAspect,
    /// Scale uniformly to cover the view (cropped).
    #[default]
    ResizeAspectFill,
}

impl VideoGravity {
    pub const ALL: &[VideoGravity] = &[
        VideoGravity::Resize,
        VideoGravity::ResizeAspect,
        VideoGravity::ResizeAspectFill,
    ];
}

impl fmt::Display for VideoGravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VideoGravity::Resize => "resize",
            VideoGravity::ResizeAspect => "aspect",
            VideoGravity::ResizeAspectFill => "aspect-fill",
        })
    }
}

impl FromStr for VideoGravity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoGravity::ALL
            .iter()
            .copied()
            .find(|g| g.to_string() == s)
            .ok_or_else(|| {
                format!("unknown gravity '{s}', expected one of: resize, aspect, aspect-fill")
            })
    }
}

/// Transform from normalized image coordinates to view pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub view: Size,
    pub image: Size,
    pub gravity: VideoGravity,
}

impl Viewport {
    pub fn new(view: Size, image: Size, gravity: VideoGravity) -> Self {
        Self {
            view,
            image,
            gravity,
        }
    }

    /// A viewport whose view is the image itself: normalized coordinates map
    /// straight onto image pixels.
    pub fn identity(image: Size) -> Self {
        Self::new(image, image, VideoGravity::Resize)
    }

    /// Same image and gravity, new view size.
    pub fn with_view(self, view: Size) -> Self {
        Self { view, ..self }
    }

    /// Rectangle the whole image occupies in view space. May extend past the
    /// view for `ResizeAspectFill`.
    pub fn content_rect(&self) -> Rect {
        if self.image.is_empty() || self.gravity == VideoGravity::Resize {
            return Rect::new(0.0, 0.0, self.view.width, self.view.height);
        }

        let sx = self.view.width / self.image.width;
        let sy = self.view.height / self.image.height;
        let scale = match self.gravity {
            VideoGravity::ResizeAspect => sx.min(sy),
            _ => sx.max(sy),
        };
        let w = self.image.width * scale;
        let h = self.image.height * scale;
        Rect::new(
            (self.view.width - w) / 2.0,
            (self.view.height - h) / 2.0,
            w,
            h,
        )
    }

    pub fn map_rect(&self, rect: &NormalizedRect) -> Rect {
        let content = self.content_rect();
        Rect::new(
            content.x + rect.x * content.width,
            content.y + rect.y * content.height,
            rect.width * content.width,
            rect.height * content.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn assert_rect(actual: Rect, expected: (f32, f32, f32, f32)) {
        assert_relative_eq!(actual.x, expected.0, epsilon = 1e-4);
        assert_relative_eq!(actual.y, expected.1, epsilon = 1e-4);
        assert_relative_eq!(actual.width, expected.2, epsilon = 1e-4);
        assert_relative_eq!(actual.height, expected.3, epsilon = 1e-4);
    }

    #[rstest]
    #[case::resize(VideoGravity::Resize)]
    #[case::aspect(VideoGravity::ResizeAspect)]
    #[case::aspect_fill(VideoGravity::ResizeAspectFill)]
    fn test_square_view_maps_quarter_rect(#[case] gravity: VideoGravity) {
        let viewport = Viewport::new(
            Size::new(1000.0, 1000.0),
            Size::new(1000.0, 1000.0),
            gravity,
        );
        let mapped = viewport.map_rect(&NormalizedRect::new(0.25, 0.25, 0.5, 0.5));
        assert_rect(mapped, (250.0, 250.0, 500.0, 500.0));
    }

    #[test]
    fn test_resize_stretches_independently() {
        let viewport = Viewport::new(
            Size::new(800.0, 400.0),
            Size::new(640.0, 480.0),
            VideoGravity::Resize,
        );
        let mapped = viewport.map_rect(&NormalizedRect::new(0.5, 0.5, 0.25, 0.25));
        assert_rect(mapped, (400.0, 200.0, 200.0, 100.0));
    }

    #[test]
    fn test_aspect_letterboxes_wide_view() {
        // 4:3 image in a 2:1 view: height-limited, scale 1.0, 160px bars
        let viewport = Viewport::new(
            Size::new(960.0, 480.0),
            Size::new(640.0, 480.0),
            VideoGravity::ResizeAspect,
        );
        assert_rect(viewport.content_rect(), (160.0, 0.0, 640.0, 480.0));
        let mapped = viewport.map_rect(&NormalizedRect::new(0.0, 0.0, 1.0, 1.0));
        assert_rect(mapped, (160.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_aspect_fill_crops_tall_view() {
        // 4:3 image in a 480x960 view: scale 2.0, image 1280x960, cropped sides
        let viewport = Viewport::new(
            Size::new(480.0, 960.0),
            Size::new(640.0, 480.0),
            VideoGravity::ResizeAspectFill,
        );
        assert_rect(viewport.content_rect(), (-400.0, 0.0, 1280.0, 960.0));
        let mapped = viewport.map_rect(&NormalizedRect::new(0.5, 0.5, 0.1, 0.1));
        assert_rect(mapped, (240.0, 480.0, 128.0, 96.0));
    }

    #[test]
    fn test_identity_maps_to_image_pixels() {
        let viewport = Viewport::identity(Size::new(200.0, 100.0));
        let mapped = viewport.map_rect(&NormalizedRect::new(0.1, 0.2, 0.3, 0.4));
        assert_rect(mapped, (20.0, 20.0, 60.0, 40.0));
    }

    #[test]
    fn test_empty_image_falls_back_to_stretch() {
        let viewport = Viewport::new(
            Size::new(100.0, 50.0),
            Size::default(),
            VideoGravity::ResizeAspectFill,
        );
        assert_rect(viewport.content_rect(), (0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn test_with_view_keeps_image_and_gravity() {
        let viewport = Viewport::identity(Size::new(10.0, 10.0)).with_view(Size::new(20.0, 20.0));
        assert_eq!(viewport.image, Size::new(10.0, 10.0));
        assert_eq!(viewport.gravity, VideoGravity::Resize);
        assert_eq!(viewport.view, Size::new(20.0, 20.0));
    }

    #[test]
    fn test_gravity_parse() {
        assert_eq!(
            "aspect-fill".parse::<VideoGravity>().unwrap(),
            VideoGravity::ResizeAspectFill
        );
        assert!("zoom".parse::<VideoGravity>().is_err());
    }
}
