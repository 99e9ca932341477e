//! Motion decision pipeline.
//!
//! Turns two consecutive raw frames into a `MotionDecision` via a fixed
//! five-stage filter chain over their absolute pixel-wise difference:
//!
//! 1. grayscale reduction of the difference image
//! 2. binary threshold at a fixed intensity cut
//! 3. downscale to the derived geometry (area thresholds are expressed in
//!    scaled-pixel units, so this happens before any area computation)
//! 4. Gaussian blur to merge fragmented motion blobs
//! 5. dilation to close small gaps inside a moving region
//!
//! The difference is computed on the raw frames, not on independently
//! filtered ones, so the blur and threshold only suppress noise in the delta
//! signal. The pipeline constants below are fixed by design and are not
//! user-tunable.

use crate::error::{DetectorError, Result};
use crate::frame::{Frame, Resolution};
use crate::imageops::ImageOps;

/// Intensity cut for the binary threshold stage.
pub const BINARY_THRESHOLD_CUT: u8 = 10;
/// Gaussian blur sigma (the 21x21 auto-sigma kernel equivalent).
pub const BLUR_SIGMA: f32 = 3.5;
/// Dilation passes applied after the blur.
pub const DILATE_ITERATIONS: u32 = 2;
/// Per-region noise floor, in garbage-area units. A lone region an order of
/// magnitude above the single-frame noise floor is still more likely sensor
/// dithering than real motion.
pub const REGION_NOISE_FLOOR_FACTOR: f64 = 10.0;
/// Upper trigger bound, in garbage-area units. An affected area approaching
/// the full scaled frame almost always indicates a non-motion artifact
/// (reconnect flash, exposure jump, lighting switch) rather than genuine
/// object motion. Preserved exactly; see DESIGN.md.
pub const UPPER_TRIGGER_FACTOR: f64 = 70.0;
/// The full scaled frame measured in garbage-area units.
pub const FULL_FRAME_FACTOR: f64 = 100.0;

/// Area thresholds derived once from the device's native resolution and the
/// startup configuration. Constant for the process lifetime unless a reopen
/// reports a different resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Baseline noise-floor area unit: 1% of the scaled frame.
    pub garbage_area: f64,
    /// Lower trigger bound: `garbage_area * sensitivity_threshold`.
    pub threshold_area: f64,
}

impl DerivedGeometry {
    pub fn compute(native: Resolution, scale: f64, sensitivity_threshold: u32) -> Self {
        let scaled_width = ((native.width as f64 * scale) as u32).max(1);
        let scaled_height = ((native.height as f64 * scale) as u32).max(1);
        let garbage_area = (scaled_width as f64 * scaled_height as f64) / FULL_FRAME_FACTOR;
        let threshold_area = garbage_area * sensitivity_threshold as f64;
        Self {
            scaled_width,
            scaled_height,
            garbage_area,
            threshold_area,
        }
    }
}

/// The outcome of one analysis cycle. Produced fresh each cycle and only
/// emitted, never kept as state.
#[derive(Clone, Debug)]
pub struct MotionDecision {
    /// Sum of surviving region areas, in scaled-pixel units.
    pub affected_area: f64,
    pub triggered: bool,
    /// The post-pipeline filtered image, for live preview and evidence.
    pub diff_image: Frame,
}

/// Stateless analyzer over an `ImageOps` capability.
pub struct MotionAnalyzer<O: ImageOps> {
    ops: O,
}

impl<O: ImageOps> MotionAnalyzer<O> {
    pub fn new(ops: O) -> Self {
        Self { ops }
    }

    /// Pure function of the two input frames and the geometry: the same
    /// inputs always produce a bit-identical decision.
    pub fn analyze(
        &self,
        previous: &Frame,
        current: &Frame,
        geometry: &DerivedGeometry,
    ) -> Result<MotionDecision> {
        if previous.resolution() != current.resolution()
            || previous.channels() != current.channels()
        {
            return Err(DetectorError::Pipeline(format!(
                "frame pair mismatch: {} ({}ch) vs {} ({}ch)",
                previous.resolution(),
                previous.channels(),
                current.resolution(),
                current.channels()
            )));
        }

        let diff = self.ops.absolute_diff(previous, current)?;
        let gray = self.ops.grayscale(&diff)?;
        let binary = self.ops.binary_threshold(&gray, BINARY_THRESHOLD_CUT)?;
        let scaled = self
            .ops
            .resize(&binary, geometry.scaled_width, geometry.scaled_height)?;
        let blurred = self.ops.gaussian_blur(&scaled, BLUR_SIGMA)?;
        let filtered = self.ops.dilate(&blurred, DILATE_ITERATIONS)?;

        let noise_floor = geometry.garbage_area * REGION_NOISE_FLOOR_FACTOR;
        let affected_area: f64 = self
            .ops
            .external_regions(&filtered)?
            .into_iter()
            .filter(|area| *area >= noise_floor)
            .sum();

        let triggered = affected_area > geometry.threshold_area
            && affected_area < geometry.garbage_area * UPPER_TRIGGER_FACTOR;

        Ok(MotionDecision {
            affected_area,
            triggered,
            diff_image: filtered,
        })
    }
}
