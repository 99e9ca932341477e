//! Acquire -> analyze -> decide -> emit orchestration.
//!
//! `MotionDetector` owns the camera session, the analyzer, the evidence sink
//! and the display, and drives the continuous cycle. The loop is
//! single-threaded and synchronous: frame `n+1` acquisition only begins after
//! frame `n`'s decision and emission are complete, and `previous` always
//! refers to the immediately preceding captured frame.
//!
//! Read failures are recovered locally (close, backoff, reopen) and never
//! cross the loop boundary; everything else terminates the loop with a
//! descriptive error.

use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::analyzer::{DerivedGeometry, MotionAnalyzer, MotionDecision};
use crate::config::DetectorConfig;
use crate::display::FrameDisplay;
use crate::error::{DetectorError, Result};
use crate::frame::{Frame, Resolution};
use crate::imageops::ImageOps;
use crate::sink::FrameSink;
use crate::source::{CameraSource, SessionState};

/// What one loop cycle did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleOutcome {
    /// First frame stored as `previous`; no decision is possible yet.
    Seeded,
    Analyzed { affected_area: f64, triggered: bool },
}

pub struct MotionDetector<O: ImageOps> {
    config: DetectorConfig,
    source: CameraSource,
    analyzer: MotionAnalyzer<O>,
    sink: Box<dyn FrameSink>,
    display: Box<dyn FrameDisplay>,
    native: Option<Resolution>,
    geometry: Option<DerivedGeometry>,
    previous: Option<Frame>,
    cycle: u64,
}

impl<O: ImageOps> MotionDetector<O> {
    pub fn new(
        config: DetectorConfig,
        source: CameraSource,
        analyzer: MotionAnalyzer<O>,
        sink: Box<dyn FrameSink>,
        display: Box<dyn FrameDisplay>,
    ) -> Self {
        Self {
            config,
            source,
            analyzer,
            sink,
            display,
            native: None,
            geometry: None,
            previous: None,
            cycle: 0,
        }
    }

    /// Run until `shutdown` is set. The flag is polled once per cycle
    /// boundary, so in-flight pipeline work is never interrupted
    /// mid-decision.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        log::info!(
            "detector loop started: camera={} scale={} sensitivity={}",
            self.config.camera_id,
            self.config.scale,
            self.config.sensitivity_threshold
        );
        while !shutdown.load(Ordering::Relaxed) {
            if let Err(err) = self.step() {
                // Release the device handle on the error path too.
                self.source.close();
                return Err(err);
            }
            thread::sleep(self.config.frame_interval);
        }
        log::info!("shutdown requested; closing camera {}", self.config.camera_id);
        self.source.close();
        Ok(())
    }

    /// Execute one cycle: acquire (with recovery), seed or analyze, present,
    /// and emit evidence on a positive decision.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        self.ensure_open()?;
        let current = self.acquire()?;
        self.cycle += 1;

        let Some(previous) = self.previous.take() else {
            log::debug!("cycle {}: seeded previous frame", self.cycle);
            self.previous = Some(current);
            return Ok(CycleOutcome::Seeded);
        };

        let geometry = self.geometry.ok_or_else(|| {
            DetectorError::Pipeline("derived geometry missing before analysis".into())
        })?;
        let decision = self.analyzer.analyze(&previous, &current, &geometry)?;

        self.display.present(&decision.diff_image);
        log::trace!(
            "cycle {}: affected_area={:.1} threshold={:.1}",
            self.cycle,
            decision.affected_area,
            geometry.threshold_area
        );

        if decision.triggered {
            let id = evidence_id();
            log::info!(
                "motion at cycle {}: affected_area={:.1} (threshold {:.1}), evidence {}",
                self.cycle,
                decision.affected_area,
                geometry.threshold_area,
                id
            );
            self.emit(&id, &previous, &current, &decision);
            self.display.present(&current);
        }

        let outcome = CycleOutcome::Analyzed {
            affected_area: decision.affected_area,
            triggered: decision.triggered,
        };
        self.previous = Some(current);
        Ok(outcome)
    }

    pub fn geometry(&self) -> Option<DerivedGeometry> {
        self.geometry
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.source.state() != SessionState::Open {
            let resolution = self.source.open()?;
            self.update_geometry(resolution);
        }
        Ok(())
    }

    /// Read one frame, recovering transient failures with a close/reopen
    /// cycle bounded by the recovery policy.
    fn acquire(&mut self) -> Result<Frame> {
        let max = self.config.recovery.max_attempts;
        let mut attempts = 0u32;
        loop {
            match self.source.read_frame() {
                Ok(frame) => return Ok(frame),
                Err(err) if err.is_transient() => {
                    attempts += 1;
                    if attempts > max {
                        return Err(DetectorError::DeviceUnavailable(format!(
                            "camera {} did not recover after {max} reopen attempts: {err}",
                            self.config.camera_id
                        )));
                    }
                    log::warn!("{err}; reopening (attempt {attempts}/{max})");
                    self.source.close();
                    if !self.config.recovery.backoff.is_zero() {
                        thread::sleep(self.config.recovery.backoff);
                    }
                    match self.source.open() {
                        Ok(resolution) => self.update_geometry(resolution),
                        // A failed reopen leaves the session closed; the next
                        // read fails too and counts against the same budget.
                        Err(open_err) => log::warn!("reopen failed: {open_err}"),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Area thresholds are tied to the device's native resolution, so they
    /// are recomputed only when a reopen reports a different one. A
    /// resolution change also drops the held previous frame: it cannot be
    /// compared against captures of the new geometry, so the next cycle
    /// reseeds instead.
    fn update_geometry(&mut self, native: Resolution) {
        if self.native == Some(native) {
            return;
        }
        self.previous = None;
        let geometry = DerivedGeometry::compute(
            native,
            self.config.scale,
            self.config.sensitivity_threshold,
        );
        log::info!(
            "derived geometry for {}: scaled {}x{}, garbage_area={:.1}, threshold_area={:.1}",
            native,
            geometry.scaled_width,
            geometry.scaled_height,
            geometry.garbage_area,
            geometry.threshold_area
        );
        self.native = Some(native);
        self.geometry = Some(geometry);
    }

    /// Evidence storage is best-effort: a failed store is logged and the
    /// loop continues.
    fn emit(&mut self, id: &str, previous: &Frame, current: &Frame, decision: &MotionDecision) {
        if let Err(err) = self.sink.store(id, current) {
            log::warn!("evidence store failed for {id}: {err:#}");
        }
        if !self.config.save_companions {
            return;
        }
        let companions = [
            (".diff", &decision.diff_image),
            (".prev", previous),
            (".current", current),
        ];
        for (suffix, frame) in companions {
            let key = format!("{id}{suffix}");
            if let Err(err) = self.sink.store(&key, frame) {
                log::warn!("evidence store failed for {key}: {err:#}");
            }
        }
    }
}

/// Collision-resistant, monotonically distinguishable evidence identifier:
/// a local timestamp with microsecond precision.
fn evidence_id() -> String {
    Local::now().format("%Y-%m-%d_%H%M%S%6f").to_string()
}
