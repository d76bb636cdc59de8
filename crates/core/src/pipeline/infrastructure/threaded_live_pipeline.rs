use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::domain::capture_source::CaptureSource;
use crate::detection::domain::detection_batch::DetectionBatch;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::live_pipeline::{
    DetectionUpdate, LiveConfig, LiveMessage, LivePipeline, LiveSession,
};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;

/// Capture → detection handoff holds a single frame: the newest one not
/// yet picked up by detection.
const HANDOFF_CAPACITY: usize = 1;

/// Runs capture and detection on two dedicated threads.
///
/// Layout: `capture → [handoff(1)] → detect → [unbounded] → UI`
///
/// With late frames discarded the capture thread never waits on detection.
/// A frame arriving while the handoff is occupied evicts the waiting one,
/// so detection always starts on the newest frame. Evicted frames go to
/// the UI as `Preview` messages, keeping the preview at camera rate while
/// detection runs at its own.
#[derive(Default)]
pub struct ThreadedLivePipeline;

impl ThreadedLivePipeline {
    pub fn new() -> Self {
        Self
    }
}

impl LivePipeline for ThreadedLivePipeline {
    fn start(
        &self,
        source: Box<dyn CaptureSource>,
        detector: Box<dyn FaceDetector>,
        logger: Box<dyn PipelineLogger>,
        config: LiveConfig,
    ) -> LiveSession {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(HANDOFF_CAPACITY);
        let (ui_tx, ui_rx) = crossbeam_channel::unbounded::<LiveMessage>();

        let capture_handle = spawn_capture(
            source,
            frame_tx,
            // Queueing relies on `send` failing once detection hangs up, so
            // only the evicting mode gets a second receiver.
            config.discard_late_frames.then(|| frame_rx.clone()),
            ui_tx.clone(),
            cancelled.clone(),
            config.clone(),
        );
        let detect_handle = spawn_detector(
            detector,
            frame_rx,
            ui_tx,
            logger,
            cancelled.clone(),
            config,
        );

        LiveSession::new(
            ui_rx,
            cancelled,
            Box::new(move || join_threads(capture_handle, detect_handle)),
        )
    }
}

/// Opens the source and pushes frames into the handoff until the stream
/// ends or the session is cancelled. Returns the number of late frames
/// dropped.
fn spawn_capture(
    mut source: Box<dyn CaptureSource>,
    frame_tx: Sender<Frame>,
    stale_rx: Option<Receiver<Frame>>,
    ui_tx: Sender<LiveMessage>,
    cancelled: Arc<AtomicBool>,
    config: LiveConfig,
) -> JoinHandle<usize> {
    std::thread::spawn(move || {
        let format = match source.open() {
            Ok(format) => format,
            Err(e) => {
                log::error!("Failed to open capture source: {e}");
                let _ = ui_tx.send(LiveMessage::Error(format!(
                    "Failed to open capture source: {e}"
                )));
                return 0;
            }
        };
        log::info!(
            "Capture started: {}x{} @ {} fps",
            format.width,
            format.height,
            format.fps
        );
        let _ = ui_tx.send(LiveMessage::Started(format));

        let mut dropped = 0;
        while !cancelled.load(Ordering::Relaxed) {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::error!("Capture failed: {e}");
                    let _ = ui_tx.send(LiveMessage::Error(format!("Capture failed: {e}")));
                    break;
                }
            };

            if let Some(stale_rx) = &stale_rx {
                let frame = match frame_tx.try_send(frame) {
                    Ok(()) => continue,
                    Err(TrySendError::Full(frame)) => frame,
                    Err(TrySendError::Disconnected(_)) => break,
                };

                // Detection is busy: replace the waiting frame with this one.
                let mut skipped = Vec::with_capacity(2);
                if let Ok(stale) = stale_rx.try_recv() {
                    skipped.push(stale);
                }
                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(late)) => skipped.push(late),
                    Err(TrySendError::Disconnected(_)) => break,
                }

                for late in skipped {
                    dropped += 1;
                    log::trace!("Dropped late frame {}", late.index());
                    if config.with_preview {
                        let preview = config.orientation.apply(&late);
                        let _ = ui_tx.send(LiveMessage::Preview(preview));
                    }
                }
            } else if frame_tx.send(frame).is_err() {
                break;
            }
        }

        source.close();
        dropped
    })
}

/// Detects faces on each handed-off frame and forwards the result to the UI.
/// Detector errors become `NoFaces`. Returns the logger for the summary.
fn spawn_detector(
    mut detector: Box<dyn FaceDetector>,
    frame_rx: Receiver<Frame>,
    ui_tx: Sender<LiveMessage>,
    mut logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
    config: LiveConfig,
) -> JoinHandle<Box<dyn PipelineLogger>> {
    std::thread::spawn(move || {
        let mut processed: usize = 0;

        for frame in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }

            let started = Instant::now();
            let batch = DetectionBatch::from_result(detector.detect(&frame, config.orientation));
            logger.timing("detect", started.elapsed().as_secs_f64() * 1000.0);
            logger.metric("faces", batch.len() as f64);

            let preview = config.with_preview.then(|| config.orientation.apply(&frame));
            processed += 1;
            logger.frame_done(processed, config.max_frames);

            let update = DetectionUpdate {
                sequence: processed as u64,
                frame_index: frame.index(),
                preview,
                batch,
            };
            if ui_tx.send(LiveMessage::Update(update)).is_err() {
                break;
            }

            if config.max_frames.is_some_and(|max| processed >= max) {
                cancelled.store(true, Ordering::Relaxed);
                break;
            }
        }

        let _ = ui_tx.send(LiveMessage::Finished);
        logger
    })
}

/// Joins both threads, records the drop count and emits the summary.
/// The first failure wins.
fn join_threads(
    capture_handle: JoinHandle<usize>,
    detect_handle: JoinHandle<Box<dyn PipelineLogger>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut first_error: Option<Box<dyn std::error::Error>> = None;

    let dropped = match capture_handle.join() {
        Ok(dropped) => dropped,
        Err(_) => {
            first_error = Some("Capture thread panicked".into());
            0
        }
    };

    match detect_handle.join() {
        Ok(mut logger) => {
            logger.metric("dropped", dropped as f64);
            logger.summary();
        }
        Err(_) => {
            if first_error.is_none() {
                first_error = Some("Detection thread panicked".into());
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_source::CaptureFormat;
    use crate::detection::domain::face_detector::DetectedFace;
    use crate::detection::domain::orientation::ImageOrientation;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::PixelFormat;
    use crate::shared::geometry::NormalizedRect;
    use std::sync::Mutex;
    use std::time::Duration;

    // --- Stubs ---

    struct StubSource {
        remaining: usize,
        next_index: usize,
        fail_open: bool,
        interval: Duration,
        closed: Arc<AtomicBool>,
    }

    impl StubSource {
        fn new(frames: usize) -> Self {
            Self {
                remaining: frames,
                next_index: 0,
                fail_open: false,
                interval: Duration::ZERO,
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl CaptureSource for StubSource {
        fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("device busy".into());
            }
            Ok(CaptureFormat {
                width: 2,
                height: 1,
                fps: 30,
                pixel_format: PixelFormat::Rgb8,
            })
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            std::thread::sleep(self.interval);
            let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Rgb8, self.next_index);
            self.next_index += 1;
            Ok(Some(frame))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::Relaxed);
        }
    }

    struct StubDetector {
        faces: Vec<DetectedFace>,
        fail: bool,
        delay: Duration,
        seen: Arc<Mutex<Vec<ImageOrientation>>>,
    }

    impl StubDetector {
        fn new(faces: usize) -> Self {
            Self {
                faces: (0..faces)
                    .map(|i| DetectedFace {
                        bounds: NormalizedRect::new(i as f32 * 0.1, 0.0, 0.1, 0.1),
                        confidence: 0.9,
                    })
                    .collect(),
                fail: false,
                delay: Duration::ZERO,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            orientation: ImageOrientation,
        ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            self.seen.lock().unwrap().push(orientation);
            std::thread::sleep(self.delay);
            if self.fail {
                return Err("inference failed".into());
            }
            Ok(self.faces.clone())
        }
    }

    /// Collects every message until `Finished`.
    fn collect(session: &LiveSession) -> Vec<LiveMessage> {
        let mut messages = Vec::new();
        while let Some(message) = session.recv_timeout(Duration::from_secs(5)) {
            let done = matches!(message, LiveMessage::Finished);
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }

    fn previews(messages: &[LiveMessage]) -> Vec<&Frame> {
        messages
            .iter()
            .filter_map(|m| match m {
                LiveMessage::Preview(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    fn updates(messages: &[LiveMessage]) -> Vec<&DetectionUpdate> {
        messages
            .iter()
            .filter_map(|m| match m {
                LiveMessage::Update(u) => Some(u),
                _ => None,
            })
            .collect()
    }

    fn queued_config() -> LiveConfig {
        LiveConfig {
            discard_late_frames: false,
            ..LiveConfig::default()
        }
    }

    // --- Tests ---

    #[test]
    fn test_every_frame_detected_when_queueing() {
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(5)),
            Box::new(StubDetector::new(2)),
            Box::new(NullPipelineLogger),
            queued_config(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        assert!(matches!(messages[0], LiveMessage::Started(_)));
        assert!(matches!(messages.last(), Some(LiveMessage::Finished)));
        let updates = updates(&messages);
        assert_eq!(updates.len(), 5);
        let sequences: Vec<u64> = updates.iter().map(|u| u.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert!(updates.iter().all(|u| u.batch.len() == 2));
    }

    #[test]
    fn test_detector_receives_configured_orientation() {
        let detector = StubDetector::new(0);
        let seen = detector.seen.clone();
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(2)),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            queued_config(),
        );
        collect(&session);
        session.stop().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|&o| o == ImageOrientation::UpMirrored));
    }

    #[test]
    fn test_preview_is_oriented_frame() {
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(1)),
            Box::new(StubDetector::new(0)),
            Box::new(NullPipelineLogger),
            queued_config(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        let preview = updates(&messages)[0].preview.clone().unwrap();
        assert_eq!(preview.data(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_preview_omitted_when_disabled() {
        let config = LiveConfig {
            with_preview: false,
            ..queued_config()
        };
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(1)),
            Box::new(StubDetector::new(1)),
            Box::new(NullPipelineLogger),
            config,
        );
        let messages = collect(&session);
        session.stop().unwrap();
        assert!(updates(&messages)[0].preview.is_none());
    }

    #[test]
    fn test_detector_failure_becomes_no_faces() {
        let mut detector = StubDetector::new(3);
        detector.fail = true;
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(2)),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            queued_config(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        let updates = updates(&messages);
        assert_eq!(updates.len(), 2);
        assert!(updates
            .iter()
            .all(|u| u.batch == DetectionBatch::NoFaces));
        assert!(!messages.iter().any(|m| matches!(m, LiveMessage::Error(_))));
    }

    #[test]
    fn test_late_frames_are_dropped_while_detection_is_busy() {
        let mut detector = StubDetector::new(1);
        detector.delay = Duration::from_millis(50);
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(40)),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            LiveConfig::default(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        let updates = updates(&messages);
        assert!(!updates.is_empty());
        assert!(updates.len() < 40, "expected drops, got {}", updates.len());
        // frame indices still increase even with gaps
        assert!(updates
            .windows(2)
            .all(|w| w[0].frame_index < w[1].frame_index));
    }

    #[test]
    fn test_busy_detection_picks_up_newest_frame() {
        let mut source = StubSource::new(30);
        source.interval = Duration::from_millis(5);
        let mut detector = StubDetector::new(1);
        detector.delay = Duration::from_millis(60);
        let session = ThreadedLivePipeline::new().start(
            Box::new(source),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            LiveConfig::default(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        let indices: Vec<usize> = updates(&messages).iter().map(|u| u.frame_index).collect();
        assert!(indices.len() >= 2);
        // Several frames arrive during the first detection; the next one
        // detected must be recent, not the first of them.
        assert!(
            indices[1] >= indices[0] + 5,
            "second detected frame was {} after {}",
            indices[1],
            indices[0]
        );
    }

    #[test]
    fn test_frames_skipping_detection_still_reach_preview() {
        let mut source = StubSource::new(20);
        source.interval = Duration::from_millis(2);
        let mut detector = StubDetector::new(1);
        detector.delay = Duration::from_millis(30);
        let session = ThreadedLivePipeline::new().start(
            Box::new(source),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            LiveConfig::default(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        let previews = previews(&messages);
        let updates = updates(&messages);
        assert!(!previews.is_empty());
        // every frame reaches the UI once, detected or not
        assert_eq!(previews.len() + updates.len(), 20);
        // oriented like the detector input
        assert_eq!(previews[0].data(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_no_preview_messages_when_previews_disabled() {
        let mut detector = StubDetector::new(1);
        detector.delay = Duration::from_millis(20);
        let config = LiveConfig {
            with_preview: false,
            ..LiveConfig::default()
        };
        let session = ThreadedLivePipeline::new().start(
            Box::new(StubSource::new(20)),
            Box::new(detector),
            Box::new(NullPipelineLogger),
            config,
        );
        let messages = collect(&session);
        session.stop().unwrap();
        assert!(previews(&messages).is_empty());
    }

    #[test]
    fn test_open_failure_reports_error_then_finishes() {
        let mut source = StubSource::new(3);
        source.fail_open = true;
        let session = ThreadedLivePipeline::new().start(
            Box::new(source),
            Box::new(StubDetector::new(1)),
            Box::new(NullPipelineLogger),
            queued_config(),
        );
        let messages = collect(&session);
        session.stop().unwrap();

        assert!(matches!(&messages[0], LiveMessage::Error(m) if m.contains("device busy")));
        assert!(matches!(messages.last(), Some(LiveMessage::Finished)));
        assert!(updates(&messages).is_empty());
    }

    #[test]
    fn test_max_frames_stops_session_and_closes_source() {
        let source = StubSource::new(1_000);
        let closed = source.closed.clone();
        let config = LiveConfig {
            max_frames: Some(3),
            ..queued_config()
        };
        let session = ThreadedLivePipeline::new().start(
            Box::new(source),
            Box::new(StubDetector::new(1)),
            Box::new(NullPipelineLogger),
            config,
        );
        let messages = collect(&session);
        session.stop().unwrap();

        assert_eq!(updates(&messages).len(), 3);
        assert!(closed.load(Ordering::Relaxed));
    }

    #[test]
    fn test_stop_interrupts_endless_source() {
        let source = StubSource::new(usize::MAX);
        let closed = source.closed.clone();
        let session = ThreadedLivePipeline::new().start(
            Box::new(source),
            Box::new(StubDetector::new(0)),
            Box::new(NullPipelineLogger),
            LiveConfig::default(),
        );
        assert!(session.recv_timeout(Duration::from_secs(5)).is_some());
        session.stop().unwrap();
        assert!(closed.load(Ordering::Relaxed));
    }
}
