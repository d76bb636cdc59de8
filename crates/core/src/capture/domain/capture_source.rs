use crate::shared::constants::{DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH};
use crate::shared::frame::{Frame, PixelFormat};

/// Requested capture parameters. Drivers may adjust resolution and rate.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: PixelFormat,
    /// Drop frames that arrive while detection is still busy instead of
    /// queueing them.
    pub discard_late_frames: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
            pixel_format: PixelFormat::Bgra8,
            discard_late_frames: true,
        }
    }
}

/// What a source actually delivers once opened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: PixelFormat,
}

/// Produces frames from a camera or another frame-producing device.
///
/// `open` runs on the capture thread, so implementations may hold
/// thread-affine handles once opened.
pub trait CaptureSource: Send {
    fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>>;

    /// Blocks until the next frame is available. `Ok(None)` ends the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device.
    fn close(&mut self);
}
