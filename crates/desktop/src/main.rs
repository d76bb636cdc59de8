mod app;
mod settings;
mod widgets;

use std::path::PathBuf;
use std::process;

use app::{App, Launch};
use settings::Settings;

use facelens_core::capture::domain::camera_device::{select_camera, CameraDescriptor};
use facelens_core::capture::infrastructure::nokhwa_camera_source::list_cameras;
use facelens_core::shared::constants::{BLAZEFACE_MODEL_NAME, MODEL_URL_ENV};
use facelens_core::shared::model_resolver;

const WINDOW_SIZE: iced::Size = iced::Size::new(960.0, 720.0);

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Camera and model problems are fatal before the window opens.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings();
    let camera = choose_camera(settings.device)?;
    log::info!("Using camera {camera}");
    let model_path = resolve_model(&settings)?;

    let launch = Launch {
        camera,
        model_path,
        settings,
        window_size: WINDOW_SIZE,
    };

    iced::application(move || App::new(launch.clone()), App::update, App::view)
        .title("FaceLens")
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: WINDOW_SIZE,
            ..Default::default()
        })
        .run()?;
    Ok(())
}

/// Loads settings, writing the defaults on first run so they can be edited.
fn load_settings() -> Settings {
    let settings = Settings::load();
    if Settings::config_path().is_some_and(|path| !path.exists()) {
        settings.save();
    }
    settings
}

fn choose_camera(device: Option<u32>) -> Result<CameraDescriptor, Box<dyn std::error::Error>> {
    let devices = list_cameras()?;
    Ok(select_camera(&devices, device)?)
}

fn resolve_model(settings: &Settings) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &settings.model {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
        return Ok(path.clone());
    }

    let url = std::env::var(MODEL_URL_ENV).ok();
    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));
    let path = model_resolver::resolve(
        BLAZEFACE_MODEL_NAME,
        url.as_deref(),
        bundled.as_deref(),
        Some(Box::new(|downloaded, total| {
            if total > 0 {
                log::debug!("Downloading face detection model: {downloaded}/{total} bytes");
            }
        })),
    )?;
    Ok(path)
}
