//! Configuration resolution: file, environment overrides, validation.

use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use motion_sentry::config::DetectorConfig;
use motion_sentry::DetectorError;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MOTIOND_CONFIG",
        "MOTIOND_CAMERA",
        "MOTIOND_SCALE",
        "MOTIOND_SENSITIVITY",
        "MOTIOND_SHOW_WINDOW",
        "MOTIOND_EVIDENCE_DIR",
        "MOTIOND_FRAME_INTERVAL_MS",
        "MOTIOND_MAX_READ_RETRIES",
        "MOTIOND_RETRY_BACKOFF_MS",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "camera": { "id": "stub://garage", "width": 800, "height": 600 },
            "detection": { "scale": 0.25, "sensitivity_threshold": 8 },
            "evidence": { "dir": "/tmp/motion-evidence", "save_companions": false },
            "runtime": {
                "show_window": true,
                "frame_interval_ms": 250,
                "max_read_retries": 5,
                "retry_backoff_ms": 50
            }
        }"#,
    );

    std::env::set_var("MOTIOND_CONFIG", file.path());
    std::env::set_var("MOTIOND_CAMERA", "stub://driveway");
    std::env::set_var("MOTIOND_SENSITIVITY", "12");

    let cfg = DetectorConfig::load().expect("load config");

    assert_eq!(cfg.camera_id, "stub://driveway");
    assert_eq!(cfg.camera_width, 800);
    assert_eq!(cfg.camera_height, 600);
    assert_eq!(cfg.scale, 0.25);
    assert_eq!(cfg.sensitivity_threshold, 12);
    assert!(cfg.show_window);
    assert_eq!(cfg.evidence_dir.to_str(), Some("/tmp/motion-evidence"));
    assert!(!cfg.save_companions);
    assert_eq!(cfg.frame_interval, Duration::from_millis(250));
    assert_eq!(cfg.recovery.max_attempts, 5);
    assert_eq!(cfg.recovery.backoff, Duration::from_millis(50));

    clear_env();
}

#[test]
fn missing_file_sections_fall_back_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "detection": { "scale": 0.75 } }"#);
    std::env::set_var("MOTIOND_CONFIG", file.path());

    let cfg = DetectorConfig::load().expect("load config");
    assert_eq!(cfg.scale, 0.75);
    assert_eq!(cfg.camera_id, "stub://front_camera");
    assert_eq!(cfg.sensitivity_threshold, 10);

    clear_env();
}

#[test]
fn invalid_scale_in_file_fails_fast() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "detection": { "scale": 0.0 } }"#);
    std::env::set_var("MOTIOND_CONFIG", file.path());

    let err = DetectorConfig::load().unwrap_err();
    assert!(matches!(err, DetectorError::Configuration(_)));

    clear_env();
}

#[test]
fn unparseable_env_override_fails_fast() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTIOND_SCALE", "half");
    let err = DetectorConfig::load().unwrap_err();
    assert!(matches!(err, DetectorError::Configuration(_)));

    clear_env();
}

#[test]
fn unreadable_config_file_is_a_configuration_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTIOND_CONFIG", "/nonexistent/motiond.json");
    let err = DetectorConfig::load().unwrap_err();
    assert!(matches!(err, DetectorError::Configuration(_)));

    clear_env();
}
