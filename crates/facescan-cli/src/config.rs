use facescan_core::detector::DEFAULT_CONFIDENCE_THRESHOLD;
use facescan_core::store::DEFAULT_CROP_SIZE;
use std::path::PathBuf;

/// Device and model settings, loaded from environment variables.
///
/// The data directory here is only the default; `--data-dir` wins.
pub struct Config {
    /// Root of `scanned_faces/` and `logs/` (default: ./face_data).
    pub data_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// SCRFD ONNX model file.
    pub model_path: PathBuf,
    /// Minimum detector score for a face to count.
    pub confidence_threshold: f32,
    /// Frames discarded after the stream starts (auto exposure settling).
    pub warmup_frames: usize,
    /// Side length of saved face crops, in pixels.
    pub crop_size: u32,
}

impl Config {
    /// Load configuration from `FACESCAN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_path = std::env::var("FACESCAN_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir().join("det_10g.onnx"));

        Self {
            data_dir: std::env::var("FACESCAN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("face_data")),
            camera_device: std::env::var("FACESCAN_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_path,
            confidence_threshold: env_f32(
                "FACESCAN_CONFIDENCE_THRESHOLD",
                DEFAULT_CONFIDENCE_THRESHOLD,
            )
            .clamp(0.0, 1.0),
            warmup_frames: env_usize("FACESCAN_WARMUP_FRAMES", 4),
            crop_size: env_u32("FACESCAN_CROP_SIZE", DEFAULT_CROP_SIZE),
        }
    }
}

/// `$XDG_DATA_HOME/facescan/models`, falling back to `~/.local/share`.
fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facescan")
        .join("models")
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name; tests run in parallel.

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("FACESCAN_TEST_GARBAGE_F32", "not-a-number");
        assert_eq!(env_f32("FACESCAN_TEST_GARBAGE_F32", 0.5), 0.5);
    }

    #[test]
    fn test_env_parse_reads_value() {
        std::env::set_var("FACESCAN_TEST_WARMUP", "9");
        assert_eq!(env_usize("FACESCAN_TEST_WARMUP", 4), 9);
    }

    #[test]
    fn test_env_parse_unset_uses_default() {
        assert_eq!(env_u32("FACESCAN_TEST_NEVER_SET", 200), 200);
    }
}
