use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facelens_core::capture::domain::capture_source::CaptureConfig;
use facelens_core::detection::domain::orientation::ImageOrientation;
use facelens_core::detection::infrastructure::onnx_blazeface_detector::DEFAULT_CONFIDENCE;
use facelens_core::overlay::domain::overlay_shape::{Color, OverlayStyle};
use facelens_core::overlay::domain::viewport::VideoGravity;
use facelens_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Camera index; `None` picks the best front camera.
    pub device: Option<u32>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub discard_late_frames: bool,
    /// Explicit model file; `None` uses the model cache.
    pub model: Option<PathBuf>,
    pub confidence: f32,
    #[serde(with = "as_string")]
    pub orientation: ImageOrientation,
    #[serde(with = "as_string")]
    pub gravity: VideoGravity,
    pub stroke_color: [u8; 3],
    pub stroke_width: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
            discard_late_frames: true,
            model: None,
            confidence: DEFAULT_CONFIDENCE,
            orientation: ImageOrientation::UpMirrored,
            gravity: VideoGravity::ResizeAspectFill,
            stroke_color: [0, 255, 0],
            stroke_width: 2.0,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads the settings file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid settings in {}: {e}", path.display());
            Self::default()
        })
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                log::warn!("Failed to save settings to {}: {e}", path.display());
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            discard_late_frames: self.discard_late_frames,
            ..CaptureConfig::default()
        }
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        let [r, g, b] = self.stroke_color;
        OverlayStyle {
            stroke: Color::rgb(r, g, b),
            stroke_width: self.stroke_width.max(0.5),
            ..OverlayStyle::default()
        }
    }
}

/// Stores a `Display`/`FromStr` value as its string form.
mod as_string {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
