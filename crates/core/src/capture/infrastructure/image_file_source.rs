use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::capture::domain::capture_source::{CaptureFormat, CaptureSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{Frame, PixelFormat};

/// Replays still image files as a finite frame stream.
///
/// Lets the detection pipeline run without camera hardware; a single
/// image behaves like a one-frame capture.
pub struct ImageFileSource {
    pending: VecDeque<PathBuf>,
    frame_index: usize,
}

impl ImageFileSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
            frame_index: 0,
        }
    }
}

/// Decodes an image file into an RGB frame.
pub fn read_image(path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.into_rgb8();
    let (w, h) = img.dimensions();
    Ok(Frame::new(img.into_raw(), w, h, PixelFormat::Rgb8, index))
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl CaptureSource for ImageFileSource {
    fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>> {
        let first = self.pending.front().ok_or("No images to read")?;
        let (width, height) = image::image_dimensions(first)?;
        Ok(CaptureFormat {
            width,
            height,
            fps: 0,
            pixel_format: PixelFormat::Rgb8,
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let frame = read_image(&path, self.frame_index)?;
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.pending.clear();
    }
}
