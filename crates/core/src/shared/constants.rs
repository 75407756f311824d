pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Directory under the platform temp root holding downloaded videos.
pub const CACHE_DIR_NAME: &str = "face_collector_cache";

/// Directory, relative to the working directory, holding per-run outputs.
pub const OUTPUT_DIR_NAME: &str = "output";

/// Stills extracted per second of source video.
pub const DEFAULT_SAMPLE_RATE: f64 = 1.0;

pub const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

pub const SCRATCH_DIR_PREFIX: &str = "face_collector_frames";
