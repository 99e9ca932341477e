//! motion-sentry - frame-differencing motion detection kernel.
//!
//! This crate continuously samples frames from a capture device and decides,
//! frame over frame, whether meaningful motion occurred, persisting evidence
//! frames when it does. Decisions are purely geometric: pixel-area ratios in
//! a downscaled coordinate space, with no learned model and no understanding
//! of what moved.
//!
//! # Architecture
//!
//! Three components composed in a single synchronous control loop:
//!
//! - [`source::CameraSource`]: session state machine over the capture-driver
//!   seam; read failures fault the session instead of retrying internally.
//! - [`analyzer::MotionAnalyzer`]: turns a pair of consecutive frames into a
//!   [`analyzer::MotionDecision`] via differencing, filtering, and area
//!   aggregation over an [`imageops::ImageOps`] capability.
//! - [`detector::MotionDetector`]: drives acquire -> analyze -> decide ->
//!   emit, owns the recovery policy, and routes positive decisions to the
//!   evidence [`sink::FrameSink`] and the [`display::FrameDisplay`].
//!
//! # Module structure
//!
//! - `frame`: immutable frame values with acquisition order
//! - `source`: camera session layer and synthetic devices
//! - `imageops`: image-processing capability and the supplied CPU engine
//! - `analyzer`: the five-stage diff pipeline and derived geometry
//! - `detector`: the orchestration loop
//! - `sink` / `display`: evidence persistence and live preview collaborators
//! - `config` / `error`: startup configuration and the error taxonomy

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod display;
pub mod error;
pub mod frame;
pub mod imageops;
pub mod sink;
pub mod source;

pub use analyzer::{DerivedGeometry, MotionAnalyzer, MotionDecision};
pub use config::{DetectorConfig, RecoveryPolicy};
pub use detector::{CycleOutcome, MotionDetector};
pub use display::{FrameDisplay, NullDisplay, PreviewDisplay};
pub use error::DetectorError;
pub use frame::{Frame, Resolution};
pub use imageops::{ImageOps, PixelEngine};
pub use sink::{DirectoryFrameSink, FrameSink, InMemoryFrameSink};
pub use source::{
    CameraSource, CaptureDevice, DeviceStats, ScriptStep, ScriptedDevice, SessionState,
    SyntheticDevice,
};
