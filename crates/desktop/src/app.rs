use std::path::PathBuf;
use std::time::Duration;

use iced::widget::{container, image, stack, text};
use iced::{alignment, ContentFit, Element, Length, Subscription, Task};

use facelens_core::capture::domain::camera_device::CameraDescriptor;
use facelens_core::capture::infrastructure::nokhwa_camera_source::NokhwaCameraSource;
use facelens_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facelens_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facelens_core::overlay::domain::viewport::{VideoGravity, Viewport};
use facelens_core::pipeline::infrastructure::threaded_live_pipeline::ThreadedLivePipeline;
use facelens_core::pipeline::live_pipeline::{
    DetectionUpdate, LiveConfig, LiveMessage, LivePipeline, LiveSession,
};
use facelens_core::pipeline::pipeline_logger::NullPipelineLogger;
use facelens_core::shared::frame::Frame;
use facelens_core::shared::geometry::Size as ImageSize;

use crate::settings::Settings;
use crate::widgets::overlay_canvas::overlay_canvas;

/// UI refresh period. The detection channel is drained once per tick.
const TICK: Duration = Duration::from_millis(16);

/// Everything resolved before the window opens.
#[derive(Debug, Clone)]
pub struct Launch {
    pub camera: CameraDescriptor,
    pub model_path: PathBuf,
    pub settings: Settings,
    pub window_size: iced::Size,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    WindowResized(iced::Size),
}

pub struct App {
    settings: Settings,
    session: Option<LiveSession>,
    renderer: OverlayRenderer,
    view_size: ImageSize,
    image_size: ImageSize,
    preview: Option<image::Handle>,
    status: String,
}

impl App {
    /// Starts the live session. Failing to load the detector closes the app.
    pub fn new(launch: Launch) -> (Self, Task<Message>) {
        let Launch {
            camera,
            model_path,
            settings,
            window_size,
        } = launch;

        let mut app = Self {
            renderer: OverlayRenderer::new(settings.overlay_style()),
            session: None,
            view_size: to_image_size(window_size),
            image_size: ImageSize::default(),
            preview: None,
            status: format!("Starting {}", camera.name),
            settings,
        };

        let detector = match OnnxBlazefaceDetector::new(&model_path, app.settings.confidence) {
            Ok(detector) => detector,
            Err(e) => {
                log::error!("Failed to load face detector: {e}");
                return (app, iced::exit());
            }
        };

        let capture = app.settings.capture_config();
        let mut config = LiveConfig::for_capture(&capture);
        config.orientation = app.settings.orientation;

        app.session = Some(ThreadedLivePipeline::new().start(
            Box::new(NokhwaCameraSource::new(camera, capture)),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            config,
        ));
        (app, Task::none())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => return self.drain_session(),
            Message::WindowResized(size) => {
                self.view_size = to_image_size(size);
                if !self.image_size.is_empty() {
                    self.renderer.relayout(self.viewport());
                }
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let preview: Element<'_, Message> = match &self.preview {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .content_fit(content_fit(self.settings.gravity))
                .into(),
            None => container(text("Waiting for camera\u{2026}"))
                .center(Length::Fill)
                .into(),
        };

        let status = container(text(&self.status).size(12))
            .width(Length::Fill)
            .height(Length::Fill)
            .align_y(alignment::Vertical::Bottom)
            .padding(8);

        let overlays = overlay_canvas(self.renderer.overlays(), self.renderer.viewport());
        stack![preview, overlays, status]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(TICK).map(|_| Message::Tick),
            iced::window::resize_events().map(|(_id, size)| Message::WindowResized(size)),
        ])
    }

    /// Applies every queued session message; only the newest update and
    /// the newest frame are rendered. A capture error closes the app.
    fn drain_session(&mut self) -> Task<Message> {
        let Some(session) = &self.session else {
            return Task::none();
        };

        let mut latest: Option<DetectionUpdate> = None;
        let mut frame: Option<Frame> = None;
        for message in session.drain() {
            match message {
                LiveMessage::Started(format) => {
                    self.status = format!(
                        "{}x{} @ {} fps",
                        format.width, format.height, format.fps
                    );
                }
                LiveMessage::Update(mut update) => {
                    if let Some(preview) = update.preview.take() {
                        frame = Some(preview);
                    }
                    latest = Some(update);
                }
                LiveMessage::Preview(preview) => frame = Some(preview),
                LiveMessage::Error(e) => {
                    log::error!("{e}");
                    return iced::exit();
                }
                LiveMessage::Finished => {
                    self.status = "Camera stopped".to_string();
                }
            }
        }

        if let Some(frame) = frame {
            self.show_frame(&frame);
        }
        if let Some(update) = latest {
            self.apply(update);
        }
        Task::none()
    }

    fn show_frame(&mut self, frame: &Frame) {
        let size = ImageSize::new(frame.width() as f32, frame.height() as f32);
        if size != self.image_size {
            self.image_size = size;
            self.renderer.relayout(self.viewport());
        }
        self.preview = Some(image::Handle::from_rgba(
            frame.width(),
            frame.height(),
            frame.to_rgba(),
        ));
    }

    fn apply(&mut self, update: DetectionUpdate) {
        if self.image_size.is_empty() {
            return;
        }
        let viewport = self.viewport();
        let faces = self.renderer.update(&update.batch, viewport).len();
        log::trace!("Frame {}: {faces} overlay(s)", update.frame_index);
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.view_size, self.image_size, self.settings.gravity)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.stop() {
                log::warn!("Live session did not shut down cleanly: {e}");
            }
        }
    }
}

/// Image fit matching the viewport's gravity, so overlays line up.
fn content_fit(gravity: VideoGravity) -> ContentFit {
    match gravity {
        VideoGravity::Resize => ContentFit::Fill,
        VideoGravity::ResizeAspect => ContentFit::Contain,
        VideoGravity::ResizeAspectFill => ContentFit::Cover,
    }
}

fn to_image_size(size: iced::Size) -> ImageSize {
    ImageSize::new(size.width, size.height)
}
