use std::fmt;
use std::str::FromStr;

use crate::shared::frame::Frame;

/// How a stored frame relates to its upright presentation, using the EXIF
/// orientation conventions.
///
/// Detectors receive the orientation alongside the raw frame and report
/// rectangles in the upright (oriented) image space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImageOrientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    /// Transpose: mirrored, then rotated 90° counter-clockwise.
    LeftMirrored,
    /// Upright after a 90° clockwise rotation.
    Right,
    /// Transverse: mirrored, then rotated 90° clockwise.
    RightMirrored,
    /// Upright after a 90° counter-clockwise rotation.
    Left,
}

impl ImageOrientation {
    pub const ALL: &[ImageOrientation] = &[
        ImageOrientation::Up,
        ImageOrientation::UpMirrored,
        ImageOrientation::Down,
        ImageOrientation::DownMirrored,
        ImageOrientation::LeftMirrored,
        ImageOrientation::Right,
        ImageOrientation::RightMirrored,
        ImageOrientation::Left,
    ];

    /// True when width and height swap.
    pub fn is_transposed(self) -> bool {
        matches!(
            self,
            ImageOrientation::LeftMirrored
                | ImageOrientation::Right
                | ImageOrientation::RightMirrored
                | ImageOrientation::Left
        )
    }

    /// Size of the upright image for a stored `width × height` frame.
    pub fn oriented_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.is_transposed() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Maps an upright pixel `(dx, dy)` back to the stored pixel it comes from.
    fn source_coords(self, dx: u32, dy: u32, w: u32, h: u32) -> (u32, u32) {
        match self {
            ImageOrientation::Up => (dx, dy),
            ImageOrientation::UpMirrored => (w - 1 - dx, dy),
            ImageOrientation::Down => (w - 1 - dx, h - 1 - dy),
            ImageOrientation::DownMirrored => (dx, h - 1 - dy),
            ImageOrientation::LeftMirrored => (dy, dx),
            ImageOrientation::Right => (dy, h - 1 - dx),
            ImageOrientation::RightMirrored => (w - 1 - dy, h - 1 - dx),
            ImageOrientation::Left => (w - 1 - dy, dx),
        }
    }

    /// Returns the upright copy of `frame`, keeping its pixel format and index.
    pub fn apply(self, frame: &Frame) -> Frame {
        if self == ImageOrientation::Up {
            return frame.clone();
        }

        let w = frame.width();
        let h = frame.height();
        let c = frame.channels() as usize;
        let (ow, oh) = self.oriented_size(w, h);
        let src = frame.data();
        let mut out = vec![0u8; src.len()];

        for dy in 0..oh {
            for dx in 0..ow {
                let (sx, sy) = self.source_coords(dx, dy, w, h);
                let s = (sy as usize * w as usize + sx as usize) * c;
                let d = (dy as usize * ow as usize + dx as usize) * c;
                out[d..d + c].copy_from_slice(&src[s..s + c]);
            }
        }

        Frame::new(out, ow, oh, frame.format(), frame.index())
    }
}

impl fmt::Display for ImageOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageOrientation::Up => "up",
            ImageOrientation::UpMirrored => "up-mirrored",
            ImageOrientation::Down => "down",
            ImageOrientation::DownMirrored => "down-mirrored",
            ImageOrientation::LeftMirrored => "left-mirrored",
            ImageOrientation::Right => "right",
            ImageOrientation::RightMirrored => "right-mirrored",
            ImageOrientation::Left => "left",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageOrientation::ALL
            .iter()
            .copied()
            .find(|o| o.to_string() == s)
            .ok_or_else(|| {
                let names: Vec<String> = ImageOrientation::ALL
                    .iter()
                    .map(|o| o.to_string())
                    .collect();
                format!(
                    "unknown orientation '{s}', expected one of: {}",
                    names.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;
    use rstest::rstest;

    /// 3x2 RGB frame whose red channel encodes the pixel
    /// number in row-major order:
    ///
    /// ```text
    /// 0 1 2
    /// 3 4 5
    /// ```
    fn numbered_frame() -> Frame {
        let mut data = Vec::new();
        for n in 0..6u8 {
            data.extend_from_slice(&[n, 0, 0]);
        }
        Frame::new(data, 3, 2, PixelFormat::Rgb8, 9)
    }

    fn reds(frame: &Frame) -> Vec<u8> {
        frame.data().chunks_exact(3).map(|px| px[0]).collect()
    }

    #[rstest]
    #[case::up(ImageOrientation::Up, (3, 2), vec![0, 1, 2, 3, 4, 5])]
    #[case::up_mirrored(ImageOrientation::UpMirrored, (3, 2), vec![2, 1, 0, 5, 4, 3])]
    #[case::down(ImageOrientation::Down, (3, 2), vec![5, 4, 3, 2, 1, 0])]
    #[case::down_mirrored(ImageOrientation::DownMirrored, (3, 2), vec![3, 4, 5, 0, 1, 2])]
    #[case::left_mirrored(ImageOrientation::LeftMirrored, (2, 3), vec![0, 3, 1, 4, 2, 5])]
    #[case::right(ImageOrientation::Right, (2, 3), vec![3, 0, 4, 1, 5, 2])]
    #[case::right_mirrored(ImageOrientation::RightMirrored, (2, 3), vec![5, 2, 4, 1, 3, 0])]
    #[case::left(ImageOrientation::Left, (2, 3), vec![2, 5, 1, 4, 0, 3])]
    fn test_apply_reorders_pixels(
        #[case] orientation: ImageOrientation,
        #[case] size: (u32, u32),
        #[case] expected: Vec<u8>,
    ) {
        let oriented = orientation.apply(&numbered_frame());
        assert_eq!((oriented.width(), oriented.height()), size);
        assert_eq!(reds(&oriented), expected);
        assert_eq!(oriented.index(), 9);
    }

    #[test]
    fn test_apply_keeps_bgra_pixels_intact() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let frame = Frame::new(data, 2, 1, PixelFormat::Bgra8, 0);
        let mirrored = ImageOrientation::UpMirrored.apply(&frame);
        assert_eq!(mirrored.data(), &[5, 6, 7, 8, 1, 2, 3, 4]);
        assert_eq!(mirrored.format(), PixelFormat::Bgra8);
    }

    #[test]
    fn test_oriented_size_swaps_for_transposed() {
        assert_eq!(ImageOrientation::Right.oriented_size(640, 480), (480, 640));
        assert_eq!(ImageOrientation::Down.oriented_size(640, 480), (640, 480));
    }

    #[test]
    fn test_parse_round_trips_every_name() {
        for &o in ImageOrientation::ALL {
            assert_eq!(o.to_string().parse::<ImageOrientation>().unwrap(), o);
        }
    }

    #[test]
    fn test_parse_unknown_lists_choices() {
        let err = "sideways".parse::<ImageOrientation>().unwrap_err();
        assert!(err.contains("left-mirrored"));
    }
}
