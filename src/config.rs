//! Daemon configuration.
//!
//! Configuration is resolved once at startup: a JSON config file (path from
//! `MOTIOND_CONFIG` or `--config`), then environment overrides, then
//! validation. Invalid values fail fast with a `Configuration` error before
//! the loop starts; they never surface as runtime faults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DetectorError, Result};

const DEFAULT_CAMERA_ID: &str = "stub://front_camera";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_SCALE: f64 = 0.5;
const DEFAULT_SENSITIVITY: u32 = 10;
const DEFAULT_EVIDENCE_DIR: &str = "evidence";
const DEFAULT_FRAME_INTERVAL_MS: u64 = 100;
const DEFAULT_MAX_READ_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

#[derive(Debug, Deserialize, Default)]
struct MotiondConfigFile {
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    evidence: Option<EvidenceConfigFile>,
    runtime: Option<RuntimeConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    id: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    scale: Option<f64>,
    sensitivity_threshold: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct EvidenceConfigFile {
    dir: Option<String>,
    save_companions: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RuntimeConfigFile {
    show_window: Option<bool>,
    frame_interval_ms: Option<u64>,
    max_read_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

/// Bounds for the close/reopen recovery path. An unbounded immediate retry
/// against a persistently absent device would spin; the budget makes the
/// give-up point explicit and injectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Reopen attempts before a read failure escalates to `DeviceUnavailable`.
    pub max_attempts: u32,
    /// Delay between close and reopen.
    pub backoff: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_READ_RETRIES,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Immutable startup configuration for the detector.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Capture device id. `stub://<name>` selects the synthetic device.
    pub camera_id: String,
    /// Resolution for synthetic sources; real devices report their own.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Downscale factor applied before area thresholds, in (0, 1].
    pub scale: f64,
    /// Integer multiplier on the baseline noise-floor area, > 0.
    pub sensitivity_threshold: u32,
    pub show_window: bool,
    pub evidence_dir: PathBuf,
    /// Also persist the `.diff`/`.prev`/`.current` companions on a trigger.
    pub save_companions: bool,
    /// Fixed inter-cycle delay pacing the loop.
    pub frame_interval: Duration,
    pub recovery: RecoveryPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from_file(MotiondConfigFile::default())
    }
}

impl DetectorConfig {
    /// Resolve configuration from `MOTIOND_CONFIG` (if set), environment
    /// overrides, and validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTIOND_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => MotiondConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MotiondConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let evidence = file.evidence.unwrap_or_default();
        let runtime = file.runtime.unwrap_or_default();
        Self {
            camera_id: camera.id.unwrap_or_else(|| DEFAULT_CAMERA_ID.to_string()),
            camera_width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            camera_height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            scale: detection.scale.unwrap_or(DEFAULT_SCALE),
            sensitivity_threshold: detection.sensitivity_threshold.unwrap_or(DEFAULT_SENSITIVITY),
            show_window: runtime.show_window.unwrap_or(false),
            evidence_dir: PathBuf::from(
                evidence.dir.unwrap_or_else(|| DEFAULT_EVIDENCE_DIR.to_string()),
            ),
            save_companions: evidence.save_companions.unwrap_or(true),
            frame_interval: Duration::from_millis(
                runtime.frame_interval_ms.unwrap_or(DEFAULT_FRAME_INTERVAL_MS),
            ),
            recovery: RecoveryPolicy {
                max_attempts: runtime.max_read_retries.unwrap_or(DEFAULT_MAX_READ_RETRIES),
                backoff: Duration::from_millis(
                    runtime.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
                ),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(camera) = std::env::var("MOTIOND_CAMERA") {
            if !camera.trim().is_empty() {
                self.camera_id = camera;
            }
        }
        if let Ok(scale) = std::env::var("MOTIOND_SCALE") {
            self.scale = scale
                .parse()
                .map_err(|_| DetectorError::Configuration("MOTIOND_SCALE must be a number".into()))?;
        }
        if let Ok(sensitivity) = std::env::var("MOTIOND_SENSITIVITY") {
            self.sensitivity_threshold = sensitivity.parse().map_err(|_| {
                DetectorError::Configuration("MOTIOND_SENSITIVITY must be a positive integer".into())
            })?;
        }
        if let Ok(show) = std::env::var("MOTIOND_SHOW_WINDOW") {
            self.show_window = parse_bool("MOTIOND_SHOW_WINDOW", &show)?;
        }
        if let Ok(dir) = std::env::var("MOTIOND_EVIDENCE_DIR") {
            if !dir.trim().is_empty() {
                self.evidence_dir = PathBuf::from(dir);
            }
        }
        if let Ok(interval) = std::env::var("MOTIOND_FRAME_INTERVAL_MS") {
            let ms: u64 = interval.parse().map_err(|_| {
                DetectorError::Configuration(
                    "MOTIOND_FRAME_INTERVAL_MS must be an integer number of milliseconds".into(),
                )
            })?;
            self.frame_interval = Duration::from_millis(ms);
        }
        if let Ok(retries) = std::env::var("MOTIOND_MAX_READ_RETRIES") {
            self.recovery.max_attempts = retries.parse().map_err(|_| {
                DetectorError::Configuration("MOTIOND_MAX_READ_RETRIES must be an integer".into())
            })?;
        }
        if let Ok(backoff) = std::env::var("MOTIOND_RETRY_BACKOFF_MS") {
            let ms: u64 = backoff.parse().map_err(|_| {
                DetectorError::Configuration(
                    "MOTIOND_RETRY_BACKOFF_MS must be an integer number of milliseconds".into(),
                )
            })?;
            self.recovery.backoff = Duration::from_millis(ms);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(DetectorError::Configuration(format!(
                "scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        if self.sensitivity_threshold == 0 {
            return Err(DetectorError::Configuration(
                "sensitivity_threshold must be greater than zero".into(),
            ));
        }
        if self.camera_width == 0 || self.camera_height == 0 {
            return Err(DetectorError::Configuration(
                "camera resolution must be non-zero".into(),
            ));
        }
        if self.camera_id.trim().is_empty() {
            return Err(DetectorError::Configuration("camera id must be set".into()));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MotiondConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DetectorError::Configuration(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        DetectorError::Configuration(format!("invalid config file {}: {}", path.display(), e))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(DetectorError::Configuration(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = DetectorConfig::default();
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.camera_id, "stub://front_camera");
        assert_eq!(cfg.scale, 0.5);
        assert_eq!(cfg.sensitivity_threshold, 10);
        assert!(!cfg.show_window);
        assert!(cfg.save_companions);
        assert_eq!(cfg.frame_interval, Duration::from_millis(100));
        assert_eq!(cfg.recovery.max_attempts, 3);
    }

    #[test]
    fn zero_scale_is_rejected() {
        let cfg = DetectorConfig {
            scale: 0.0,
            ..DetectorConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, DetectorError::Configuration(_)));
    }

    #[test]
    fn oversized_scale_is_rejected() {
        let cfg = DetectorConfig {
            scale: 1.5,
            ..DetectorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_sensitivity_is_rejected() {
        let cfg = DetectorConfig {
            sensitivity_threshold: 0,
            ..DetectorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", "1").unwrap());
        assert!(!parse_bool("K", "no").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }
}
