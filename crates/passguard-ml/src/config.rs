use anyhow::Context;
use passguard_core::{MissingDocumentPolicy, Thresholds};
use passguard_media::MediaSettings;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:8000).
    pub bind_addr: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Cap on the longer side of decoded frames.
    pub max_frame_dim: u32,
    pub image_timeout_secs: u64,
    pub video_timeout_secs: u64,
    /// Optional TOML file overriding decision thresholds.
    pub thresholds_file: Option<PathBuf>,
    pub missing_document: MissingDocumentPolicy,
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Tesseract language list, e.g. `eng+rus`. Unset disables OCR.
    pub ocr_langs: Option<String>,
}

impl Config {
    /// Load configuration from `PASSGUARD_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let missing_document = match var("PASSGUARD_MISSING_DOCUMENT") {
            Some(v) => v.parse().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "invalid PASSGUARD_MISSING_DOCUMENT; using default");
                MissingDocumentPolicy::default()
            }),
            None => MissingDocumentPolicy::default(),
        };

        Self {
            bind_addr: var("PASSGUARD_BIND").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            model_dir: var("PASSGUARD_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(passguard_core::default_model_dir),
            max_frame_dim: parsed(&var, "PASSGUARD_MAX_FRAME_DIM", passguard_core::frame::DEFAULT_MAX_FRAME_DIM),
            image_timeout_secs: parsed(&var, "PASSGUARD_IMAGE_TIMEOUT_SECS", 20),
            video_timeout_secs: parsed(&var, "PASSGUARD_VIDEO_TIMEOUT_SECS", 40),
            thresholds_file: var("PASSGUARD_THRESHOLDS_FILE").map(PathBuf::from),
            missing_document,
            ffmpeg: var("PASSGUARD_FFMPEG").unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe: var("PASSGUARD_FFPROBE").unwrap_or_else(|| "ffprobe".to_string()),
            ocr_langs: var("PASSGUARD_OCR_LANGS").filter(|v| !v.trim().is_empty()),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_path("det_10g.onnx")
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_path("w600k_r50.onnx")
    }

    /// Path to the 468-point face mesh model.
    pub fn landmark_model_path(&self) -> String {
        self.model_path("face_landmark.onnx")
    }

    fn model_path(&self, file: &str) -> String {
        self.model_dir.join(file).to_string_lossy().into_owned()
    }

    pub fn media_settings(&self) -> MediaSettings {
        MediaSettings {
            image_timeout: Duration::from_secs(self.image_timeout_secs),
            video_timeout: Duration::from_secs(self.video_timeout_secs),
            max_frame_dim: self.max_frame_dim,
        }
    }

    /// Defaults, overridden by the calibration file when one is configured.
    pub fn thresholds(&self) -> anyhow::Result<Thresholds> {
        match &self.thresholds_file {
            Some(path) => load_thresholds(path),
            None => Ok(Thresholds::default()),
        }
    }
}

fn load_thresholds(path: &Path) -> anyhow::Result<Thresholds> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading thresholds file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing thresholds file {}", path.display()))
}

fn parsed<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.max_frame_dim, 720);
        assert_eq!(cfg.missing_document, MissingDocumentPolicy::Pass);
        assert!(cfg.ocr_langs.is_none());

        let media = cfg.media_settings();
        assert_eq!(media.image_timeout, Duration::from_secs(20));
        assert_eq!(media.video_timeout, Duration::from_secs(40));
        assert_eq!(cfg.thresholds().unwrap(), Thresholds::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cfg = config(&[
            ("PASSGUARD_MODEL_DIR", "/models"),
            ("PASSGUARD_MAX_FRAME_DIM", "not-a-number"),
            ("PASSGUARD_VIDEO_TIMEOUT_SECS", "90"),
            ("PASSGUARD_MISSING_DOCUMENT", "review"),
            ("PASSGUARD_OCR_LANGS", "  "),
        ]);
        assert_eq!(cfg.scrfd_model_path(), "/models/det_10g.onnx");
        assert_eq!(cfg.max_frame_dim, 720);
        assert_eq!(cfg.video_timeout_secs, 90);
        assert_eq!(cfg.missing_document, MissingDocumentPolicy::Review);
        assert!(cfg.ocr_langs.is_none());

        let cfg = config(&[("PASSGUARD_MISSING_DOCUMENT", "maybe")]);
        assert_eq!(cfg.missing_document, MissingDocumentPolicy::Pass);
    }

    #[test]
    fn test_thresholds_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "motion = 3.0\nface_match = 0.6").unwrap();
        let cfg = config(&[("PASSGUARD_THRESHOLDS_FILE", file.path().to_str().unwrap())]);
        let t = cfg.thresholds().unwrap();
        assert_eq!(t.motion, 3.0);
        assert_eq!(t.face_match, 0.6);
        assert_eq!(t.blink_delta, Thresholds::default().blink_delta);
    }

    #[test]
    fn test_missing_thresholds_file_is_an_error() {
        let cfg = config(&[("PASSGUARD_THRESHOLDS_FILE", "/nonexistent/passguard-thresholds.toml")]);
        let err = cfg.thresholds().unwrap_err();
        assert!(err.to_string().contains("reading thresholds file"));
    }
}
