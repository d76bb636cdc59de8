pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range_128.onnx";

/// Environment variable holding a download URL for the BlazeFace model.
pub const MODEL_URL_ENV: &str = "FACELENS_MODEL_URL";

/// Directory name used for the model cache and the desktop settings.
pub const APP_DIR_NAME: &str = "facelens";

pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
