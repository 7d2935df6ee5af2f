use doorwatch_audio::EventDelays;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Directory of reference face images.
    pub gallery_dir: PathBuf,
    /// Directory containing the four track files.
    pub sound_dir: PathBuf,
    /// Cosine similarity threshold for a positive face match.
    pub similarity_threshold: f32,
    /// Per-category delay before the one-shot track starts.
    pub delays: EventDelays,
}

impl Config {
    /// Load configuration from `DOORWATCH_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            camera_device: std::env::var("DOORWATCH_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir: env_path("DOORWATCH_MODEL_DIR", "models"),
            gallery_dir: env_path("DOORWATCH_GALLERY_DIR", "friends"),
            sound_dir: env_path("DOORWATCH_SOUND_DIR", "sounds"),
            similarity_threshold: env_f32("DOORWATCH_SIMILARITY_THRESHOLD", 0.40),
            delays: EventDelays {
                friend: env_delay_ms("DOORWATCH_DELAY_FRIEND_MS"),
                thief: env_delay_ms("DOORWATCH_DELAY_THIEF_MS"),
                delivery: env_delay_ms("DOORWATCH_DELAY_DELIVERY_MS"),
            },
        }
    }

    /// Path to the YOLOv8 object detection model.
    pub fn yolo_model_path(&self) -> String {
        self.model_dir
            .join("yolov8n.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the SCRFD face detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Event delays default to zero (one-shots start immediately).
fn env_delay_ms(key: &str) -> Duration {
    let ms = std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0u64);
    Duration::from_millis(ms)
}
