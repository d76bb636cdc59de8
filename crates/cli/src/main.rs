use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};

use facelens_core::capture::domain::camera_device::{select_camera, CameraDescriptor};
use facelens_core::capture::domain::capture_source::CaptureConfig;
use facelens_core::capture::infrastructure::image_file_source::{is_image, ImageFileSource};
use facelens_core::capture::infrastructure::nokhwa_camera_source::{
    list_cameras, NokhwaCameraSource,
};
use facelens_core::detection::domain::face_detector::FaceDetector;
use facelens_core::detection::domain::orientation::ImageOrientation;
use facelens_core::detection::infrastructure::onnx_blazeface_detector::{
    OnnxBlazefaceDetector, DEFAULT_CONFIDENCE,
};
use facelens_core::overlay::domain::overlay_shape::OverlayStyle;
use facelens_core::overlay::infrastructure::image_file_writer::ImageFileWriter;
use facelens_core::pipeline::detect_image_use_case::DetectImageUseCase;
use facelens_core::pipeline::infrastructure::threaded_live_pipeline::ThreadedLivePipeline;
use facelens_core::pipeline::live_pipeline::{
    DetectionUpdate, LiveConfig, LiveMessage, LivePipeline,
};
use facelens_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facelens_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    MODEL_URL_ENV,
};
use facelens_core::shared::model_resolver::{self, ProgressFn};

/// Live face detection from a camera, or on still images.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List cameras and show which one would be selected.
    Cameras,

    /// Detect faces in an image, optionally writing it with boxes drawn.
    Detect {
        /// Input image file.
        input: PathBuf,

        /// Output image with face boxes.
        output: Option<PathBuf>,

        #[command(flatten)]
        detector: DetectorArgs,
    },

    /// Run live detection on a camera and print each detection batch.
    Watch {
        /// Stop after this many detected frames.
        #[arg(long)]
        frames: Option<usize>,

        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<f64>,

        /// Camera index (see `facelens cameras`). Default: best front camera.
        #[arg(long)]
        device: Option<u32>,

        #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
        width: u32,

        #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
        height: u32,

        #[arg(long, default_value_t = DEFAULT_CAPTURE_FPS)]
        fps: u32,

        /// Queue frames for detection instead of dropping late ones.
        #[arg(long)]
        keep_late_frames: bool,

        #[command(flatten)]
        detector: DetectorArgs,
    },
}

#[derive(Args)]
struct DetectorArgs {
    /// BlazeFace ONNX model. Default: cached or bundled model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Frame orientation passed to the detector (up, up-mirrored, down,
    /// down-mirrored, left-mirrored, right, right-mirrored, left).
    /// Default: up for images, up-mirrored for cameras.
    #[arg(long)]
    orientation: Option<ImageOrientation>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Cameras => run_cameras(),
        Command::Detect {
            input,
            output,
            detector,
        } => run_detect(&input, output.as_deref(), &detector),
        Command::Watch {
            frames,
            seconds,
            device,
            width,
            height,
            fps,
            keep_late_frames,
            detector,
        } => {
            let capture = CaptureConfig {
                width,
                height,
                fps,
                discard_late_frames: !keep_late_frames,
                ..CaptureConfig::default()
            };
            run_watch(device, capture, frames, seconds, &detector)
        }
    }
}

fn run_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let devices = list_cameras()?;
    if devices.is_empty() {
        println!("No cameras found");
        return Ok(());
    }

    let selected = select_camera(&devices, None).ok().map(|d| d.index);
    for device in &devices {
        let marker = if Some(device.index) == selected { "*" } else { " " };
        println!("{marker} {device}");
    }
    Ok(())
}

fn run_detect(
    input: &Path,
    output: Option<&Path>,
    args: &DetectorArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    validate(args)?;
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    if !is_image(input) {
        return Err(format!("Not a supported image file: {}", input.display()).into());
    }

    let detector = build_detector(args)?;
    let orientation = args.orientation.unwrap_or(ImageOrientation::Up);
    let mut use_case = DetectImageUseCase::new(
        Box::new(ImageFileWriter::new()),
        detector,
        OverlayStyle::default(),
        orientation,
    );

    let mut source = ImageFileSource::new([input.to_path_buf()]);
    let result = use_case.execute(&mut source, output)?;

    println!(
        "{}: {} face(s) in {}x{}",
        input.display(),
        result.batch.len(),
        result.width,
        result.height
    );
    for (face, shape) in result.batch.faces().iter().zip(&result.shapes) {
        println!(
            "  {:.2}  x={:.0} y={:.0} w={:.0} h={:.0}",
            face.confidence, shape.rect.x, shape.rect.y, shape.rect.width, shape.rect.height
        );
    }
    if let Some(output) = output {
        log::info!("Output written to {}", output.display());
    }
    Ok(())
}

fn run_watch(
    device: Option<u32>,
    capture: CaptureConfig,
    frames: Option<usize>,
    seconds: Option<f64>,
    args: &DetectorArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    validate(args)?;
    if let Some(s) = seconds {
        if s.is_nan() || s <= 0.0 {
            return Err(format!("Seconds must be positive, got {s}").into());
        }
    }

    let camera = choose_camera(device)?;
    log::info!("Using camera {camera}");
    let detector = build_detector(args)?;

    let mut config = LiveConfig::for_capture(&capture);
    config.max_frames = frames;
    config.with_preview = false;
    if let Some(orientation) = args.orientation {
        config.orientation = orientation;
    }

    let session = ThreadedLivePipeline::new().start(
        Box::new(NokhwaCameraSource::new(camera, capture)),
        detector,
        Box::new(StdoutPipelineLogger::default()),
        config,
    );

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs_f64(s));
    let mut failure = None;
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match session.recv_timeout(Duration::from_millis(100)) {
            Some(LiveMessage::Started(format)) => log::info!(
                "Streaming {}x{} @ {} fps",
                format.width,
                format.height,
                format.fps
            ),
            Some(LiveMessage::Update(update)) => print_update(&update),
            Some(LiveMessage::Preview(_)) => {}
            Some(LiveMessage::Error(message)) => {
                failure = Some(message);
                break;
            }
            Some(LiveMessage::Finished) => break,
            None => {}
        }
    }

    session.stop()?;
    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

/// A missing camera is fatal for the CLI.
fn choose_camera(device: Option<u32>) -> Result<CameraDescriptor, Box<dyn std::error::Error>> {
    let devices = list_cameras()?;
    Ok(select_camera(&devices, device)?)
}

fn print_update(update: &DetectionUpdate) {
    let faces = update.batch.faces();
    println!(
        "frame {} (#{}): {} face(s)",
        update.frame_index,
        update.sequence,
        faces.len()
    );
    for face in faces {
        let b = face.bounds;
        println!(
            "  {:.2}  x={:.3} y={:.3} w={:.3} h={:.3}",
            face.confidence, b.x, b.y, b.width, b.height
        );
    }
}

fn build_detector(args: &DetectorArgs) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &args.model {
        Some(path) => {
            if !path.exists() {
                return Err(format!("Model file not found: {}", path.display()).into());
            }
            path.clone()
        }
        None => {
            log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
            let url = std::env::var(MODEL_URL_ENV).ok();
            let bundled = bundled_models_dir();
            let downloading = Arc::new(AtomicBool::new(false));
            let path = model_resolver::resolve(
                BLAZEFACE_MODEL_NAME,
                url.as_deref(),
                bundled.as_deref(),
                Some(download_progress(downloading.clone())),
            )?;
            // finish the progress line
            if downloading.load(Ordering::Relaxed) {
                eprintln!();
            }
            path
        }
    };

    Ok(Box::new(OnnxBlazefaceDetector::new(
        &model_path,
        args.confidence,
    )?))
}

/// `models/` next to the executable.
fn bundled_models_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn validate(args: &DetectorArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            args.confidence
        )
        .into());
    }
    Ok(())
}

/// Progress line on stderr. Sets `started` once anything was printed.
fn download_progress(started: Arc<AtomicBool>) -> ProgressFn {
    Box::new(move |downloaded, total| {
        started.store(true, Ordering::Relaxed);
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            eprint!("\rDownloading face detection model... {pct}%");
        } else {
            eprint!("\rDownloading face detection model... {downloaded} bytes");
        }
    })
}
