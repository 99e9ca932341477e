//! motiond - frame-differencing motion detection daemon.
//!
//! This daemon:
//! 1. Resolves configuration (file, environment, CLI overrides)
//! 2. Opens the capture device behind a camera session
//! 3. Runs the acquire -> analyze -> decide -> emit loop
//! 4. Persists evidence frames on positive decisions
//! 5. Stops cleanly on SIGINT

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use motion_sentry::{
    CameraSource, CaptureDevice, DetectorConfig, DirectoryFrameSink, FrameDisplay, MotionAnalyzer,
    MotionDetector, NullDisplay, PixelEngine, PreviewDisplay, Resolution, SyntheticDevice,
};

#[derive(Debug, Parser)]
#[command(name = "motiond", about = "Frame-differencing motion detection daemon")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "MOTIOND_CONFIG")]
    config: Option<PathBuf>,

    /// Camera id (`stub://<name>` selects the synthetic device).
    #[arg(long)]
    camera: Option<String>,

    /// Downscale factor applied before area thresholds, in (0, 1].
    #[arg(long)]
    scale: Option<f64>,

    /// Sensitivity threshold multiplier (> 0).
    #[arg(long)]
    sensitivity: Option<u32>,

    /// Keep a live preview JPEG of the filtered diff next to the evidence.
    #[arg(long)]
    show_window: bool,

    /// Directory for evidence frames.
    #[arg(long)]
    evidence_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = DetectorConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = args.camera {
        config.camera_id = camera;
    }
    if let Some(scale) = args.scale {
        config.scale = scale;
    }
    if let Some(sensitivity) = args.sensitivity {
        config.sensitivity_threshold = sensitivity;
    }
    if let Some(dir) = args.evidence_dir {
        config.evidence_dir = dir;
    }
    if args.show_window {
        config.show_window = true;
    }
    config.validate()?;

    let device = build_device(&config)?;
    let source = CameraSource::new(&config.camera_id, device);
    let analyzer = MotionAnalyzer::new(PixelEngine);
    let sink = DirectoryFrameSink::create(&config.evidence_dir)?;
    let display: Box<dyn FrameDisplay> = if config.show_window {
        Box::new(PreviewDisplay::new(config.evidence_dir.join("preview.jpg")))
    } else {
        Box::new(NullDisplay)
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
        })?;
    }

    log::info!(
        "motiond running: camera={} evidence_dir={}",
        config.camera_id,
        config.evidence_dir.display()
    );

    let mut detector =
        MotionDetector::new(config, source, analyzer, Box::new(sink), display);
    detector.run(&shutdown)?;
    Ok(())
}

fn build_device(config: &DetectorConfig) -> Result<Box<dyn CaptureDevice>> {
    if let Some(name) = config.camera_id.strip_prefix("stub://") {
        let resolution = Resolution {
            width: config.camera_width,
            height: config.camera_height,
        };
        Ok(Box::new(SyntheticDevice::new(name, resolution)))
    } else {
        bail!(
            "camera id {} requires an external capture driver; only stub:// synthetic devices are built in",
            config.camera_id
        )
    }
}
