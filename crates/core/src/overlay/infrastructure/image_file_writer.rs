use std::path::Path;

use crate::overlay::domain::image_writer::ImageWriter;
use crate::shared::frame::{Frame, PixelFormat};

/// Writes a frame to an image file using the `image` crate.
///
/// BGRA frames are converted to RGBA; the format follows the extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match frame.format() {
            PixelFormat::Rgb8 => {
                image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                    .ok_or("Failed to create image from frame data")?
                    .save(path)?;
            }
            PixelFormat::Bgra8 => {
                // JPEG has no alpha channel, so drop it for every format.
                let rgba =
                    image::RgbaImage::from_raw(frame.width(), frame.height(), frame.to_rgba())
                        .ok_or("Failed to create image from frame data")?;
                image::DynamicImage::ImageRgba8(rgba).into_rgb8().save(path)?;
            }
        }
        Ok(())
    }
}
