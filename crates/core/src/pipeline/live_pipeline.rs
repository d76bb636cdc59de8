use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::capture::domain::capture_source::{CaptureConfig, CaptureFormat, CaptureSource};
use crate::detection::domain::detection_batch::DetectionBatch;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::orientation::ImageOrientation;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;

/// Settings for a live capture → detect session.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveConfig {
    /// Orientation passed to the detector with every frame. Front cameras
    /// deliver a mirrored image, hence `UpMirrored` by default.
    pub orientation: ImageOrientation,
    /// Drop frames while detection is busy instead of queueing them.
    pub discard_late_frames: bool,
    /// Stop after this many detected frames.
    pub max_frames: Option<usize>,
    /// Attach the oriented frame to each update and send frames that
    /// skip detection as `Preview` messages.
    pub with_preview: bool,
}

impl LiveConfig {
    pub fn for_capture(capture: &CaptureConfig) -> Self {
        Self {
            discard_late_frames: capture.discard_late_frames,
            ..Self::default()
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            orientation: ImageOrientation::UpMirrored,
            discard_late_frames: true,
            max_frames: None,
            with_preview: true,
        }
    }
}

/// Detection result for one frame, handed to the UI context.
#[derive(Clone, Debug)]
pub struct DetectionUpdate {
    /// Increases by one per detected frame, starting at 1.
    pub sequence: u64,
    /// Index assigned by the capture source.
    pub frame_index: usize,
    /// The frame in the orientation the detector used, so normalized
    /// rectangles line up with it. `None` when previews are disabled.
    pub preview: Option<Frame>,
    pub batch: DetectionBatch,
}

#[derive(Clone, Debug)]
pub enum LiveMessage {
    /// The capture source opened with this format.
    Started(CaptureFormat),
    Update(DetectionUpdate),
    /// A frame that arrived while detection was busy, oriented like the
    /// updates. Refreshes the preview only; overlays stay as they are.
    Preview(Frame),
    /// The capture source failed to open or stopped with an error.
    Error(String),
    /// No further messages follow.
    Finished,
}

type Joiner = Box<dyn FnOnce() -> Result<(), Box<dyn std::error::Error>> + Send>;

/// Handle to a running live session.
///
/// Messages arrive on an unbounded channel that the UI drains at its own
/// pace. Dropping the session cancels it without waiting for the threads.
pub struct LiveSession {
    updates: Receiver<LiveMessage>,
    cancelled: Arc<AtomicBool>,
    join: Option<Joiner>,
}

impl LiveSession {
    pub fn new(updates: Receiver<LiveMessage>, cancelled: Arc<AtomicBool>, join: Joiner) -> Self {
        Self {
            updates,
            cancelled,
            join: Some(join),
        }
    }

    /// Next pending message, without blocking.
    pub fn try_recv(&self) -> Option<LiveMessage> {
        self.updates.try_recv().ok()
    }

    /// All messages queued right now, oldest first.
    pub fn drain(&self) -> Vec<LiveMessage> {
        self.updates.try_iter().collect()
    }

    /// Waits up to `timeout` for a message. `None` on timeout or once the
    /// pipeline threads have gone away.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LiveMessage> {
        match self.updates.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancels, joins both threads and emits the session summary.
    pub fn stop(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.cancel();
        match self.join.take() {
            Some(join) => join(),
            None => Ok(()),
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts a capture → detect session.
///
/// This is a port; infrastructure decides how the stages are scheduled.
pub trait LivePipeline {
    fn start(
        &self,
        source: Box<dyn CaptureSource>,
        detector: Box<dyn FaceDetector>,
        logger: Box<dyn PipelineLogger>,
        config: LiveConfig,
    ) -> LiveSession;
}
