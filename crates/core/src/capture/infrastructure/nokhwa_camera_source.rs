use nokhwa::pixel_format::{RgbAFormat, RgbFormat};
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use crate::capture::domain::camera_device::{CameraDescriptor, CaptureError};
use crate::capture::domain::capture_source::{CaptureConfig, CaptureFormat, CaptureSource};
use crate::shared::frame::{Frame, PixelFormat};

/// Lists the cameras visible to the platform backend.
pub fn list_cameras() -> Result<Vec<CameraDescriptor>, CaptureError> {
    let devices =
        nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::Enumerate(e.to_string()))?;

    Ok(devices
        .iter()
        .enumerate()
        .map(|(idx, info)| {
            let index = info.index().as_index().unwrap_or(idx as u32);
            CameraDescriptor::from_name(index, info.human_name())
        })
        .collect())
}

/// Live camera capture through `nokhwa`.
///
/// The device is only opened in [`CaptureSource::open`], which the live
/// pipeline calls on its capture thread.
pub struct NokhwaCameraSource {
    device: CameraDescriptor,
    config: CaptureConfig,
    camera: Option<Camera>,
    frame_index: usize,
}

// Safety: the camera handle is created by `open` on the capture thread and
// is never touched from any other thread afterwards.
unsafe impl Send for NokhwaCameraSource {}

impl NokhwaCameraSource {
    pub fn new(device: CameraDescriptor, config: CaptureConfig) -> Self {
        Self {
            device,
            config,
            camera: None,
            frame_index: 0,
        }
    }

    pub fn device(&self) -> &CameraDescriptor {
        &self.device
    }

    fn open_camera(&self) -> Result<Camera, CaptureError> {
        let index = self.device.index;
        let open_err = |e: nokhwa::NokhwaError| CaptureError::Open {
            index,
            reason: e.to_string(),
        };

        let requested = match self.config.pixel_format {
            PixelFormat::Bgra8 => {
                RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestFrameRate)
            }
            PixelFormat::Rgb8 => {
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate)
            }
        };

        log::debug!(
            "Opening {} with requested {}x{} @ {} fps",
            self.device,
            self.config.width,
            self.config.height,
            self.config.fps
        );

        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(open_err)?;
        camera.open_stream().map_err(open_err)?;

        // Drivers may refuse either request; the camera default is fine.
        if let Err(e) = camera.set_resolution(Resolution::new(self.config.width, self.config.height))
        {
            log::warn!(
                "Could not set resolution {}x{}: {e}. Using camera default.",
                self.config.width,
                self.config.height
            );
        }
        if let Err(e) = camera.set_frame_rate(self.config.fps) {
            log::warn!(
                "Could not set frame rate {} fps: {e}. Using camera default.",
                self.config.fps
            );
        }

        Ok(camera)
    }
}

impl CaptureSource for NokhwaCameraSource {
    fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>> {
        let camera = self.open_camera()?;
        let resolution = camera.resolution();
        let format = CaptureFormat {
            width: resolution.width(),
            height: resolution.height(),
            fps: camera.frame_rate(),
            pixel_format: self.config.pixel_format,
        };
        log::info!(
            "Camera {} opened: {}x{} @ {} fps",
            self.device,
            format.width,
            format.height,
            format.fps
        );
        self.camera = Some(camera);
        self.frame_index = 0;
        Ok(format)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let camera = self.camera.as_mut().ok_or("Camera is not open")?;
        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::Frame(e.to_string()))?;

        let frame = match self.config.pixel_format {
            PixelFormat::Bgra8 => {
                let decoded = buffer
                    .decode_image::<RgbAFormat>()
                    .map_err(|e| CaptureError::Frame(e.to_string()))?;
                let (w, h) = decoded.dimensions();
                let mut data = decoded.into_raw();
                rgba_to_bgra_in_place(&mut data);
                Frame::new(data, w, h, PixelFormat::Bgra8, self.frame_index)
            }
            PixelFormat::Rgb8 => {
                let decoded = buffer
                    .decode_image::<RgbFormat>()
                    .map_err(|e| CaptureError::Frame(e.to_string()))?;
                let (w, h) = decoded.dimensions();
                Frame::new(decoded.into_raw(), w, h, PixelFormat::Rgb8, self.frame_index)
            }
        };

        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera stream: {e}");
            } else {
                log::info!("Camera {} stopped", self.device);
            }
        }
    }
}

impl Drop for NokhwaCameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn rgba_to_bgra_in_place(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_to_bgra_swaps_red_and_blue() {
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        rgba_to_bgra_in_place(&mut data);
        assert_eq!(data, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn test_next_frame_before_open_errors() {
        let device = CameraDescriptor::from_name(0, "Integrated Webcam");
        let mut source = NokhwaCameraSource::new(device, CaptureConfig::default());
        assert!(source.next_frame().is_err());
    }

    #[test]
    #[ignore] // Requires actual camera hardware
    fn test_capture_single_frame() {
        let devices = list_cameras().expect("failed to list cameras");
        let device = crate::capture::domain::camera_device::select_camera(&devices, None)
            .expect("no camera");
        let mut source = NokhwaCameraSource::new(device, CaptureConfig::default());
        source.open().expect("failed to open camera");
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.format(), PixelFormat::Bgra8);
        assert!(frame.width() > 0 && frame.height() > 0);
    }
}
