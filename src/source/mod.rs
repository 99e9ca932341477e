//! Camera session layer.
//!
//! `CameraSource` owns the capture device handle and hides nothing else: it
//! exposes only the session state machine (`Closed`, `Open`, `Faulted`), so
//! ownership and failure handling stay centralized. It never retries
//! internally; a read failure marks the session `Faulted` and surfaces a
//! `ReadFailure`, and the recovery policy lives in the orchestrator where it
//! is observable and testable on its own.
//!
//! `CaptureDevice` is the seam for the actual driver, which is an external
//! collaborator. Implementations should bound how long `read` can block;
//! the session layer has no watchdog above this seam.

mod synthetic;

pub use synthetic::{DeviceStats, ScriptStep, ScriptedDevice, SyntheticDevice};

use crate::error::{DetectorError, Result};
use crate::frame::{Frame, Resolution};

/// Driver seam for a single physical or logical capture device.
///
/// `open` acquires the device and reports its native resolution; `read`
/// blocks until one frame of interleaved RGB24 samples is available or the
/// device signals failure. It never fabricates a frame.
pub trait CaptureDevice {
    fn open(&mut self) -> anyhow::Result<Resolution>;
    fn read(&mut self) -> anyhow::Result<Vec<u8>>;
    fn close(&mut self);

    /// Channel depth of the frames `read` produces.
    fn channels(&self) -> u8 {
        3
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Faulted,
}

/// Session state machine over a capture device.
pub struct CameraSource {
    camera_id: String,
    device: Box<dyn CaptureDevice>,
    state: SessionState,
    resolution: Option<Resolution>,
    frames_read: u64,
}

impl CameraSource {
    pub fn new(camera_id: impl Into<String>, device: Box<dyn CaptureDevice>) -> Self {
        Self {
            camera_id: camera_id.into(),
            device,
            state: SessionState::Closed,
            resolution: None,
            frames_read: 0,
        }
    }

    /// Acquire the device: `Closed -> Open`. Idempotent when already open.
    /// A faulted session must be closed before reopening.
    pub fn open(&mut self) -> Result<Resolution> {
        match self.state {
            SessionState::Open => self.resolution.ok_or_else(|| {
                DetectorError::DeviceUnavailable(format!(
                    "camera {}: open session lost its resolution",
                    self.camera_id
                ))
            }),
            SessionState::Faulted => Err(DetectorError::DeviceUnavailable(format!(
                "camera {}: session is faulted and must be closed before reopening",
                self.camera_id
            ))),
            SessionState::Closed => {
                let resolution = self.device.open().map_err(|e| {
                    DetectorError::DeviceUnavailable(format!("camera {}: {e:#}", self.camera_id))
                })?;
                self.state = SessionState::Open;
                self.resolution = Some(resolution);
                log::info!("camera {} open at {}", self.camera_id, resolution);
                Ok(resolution)
            }
        }
    }

    /// Release the device: any state `-> Closed`. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.device.close();
            self.state = SessionState::Closed;
            log::debug!("camera {} closed", self.camera_id);
        }
    }

    /// Read one frame. Success keeps the session `Open` and returns a frame
    /// with the next sequence number; failure moves it to `Faulted` and
    /// returns `ReadFailure`. Sequence numbers keep increasing across
    /// reopens, so acquisition order stays monotonic for the process.
    pub fn read_frame(&mut self) -> Result<Frame> {
        if self.state != SessionState::Open {
            return Err(DetectorError::ReadFailure(format!(
                "camera {}: session is {:?}, not open",
                self.camera_id, self.state
            )));
        }
        let resolution = self.resolution.ok_or_else(|| {
            DetectorError::ReadFailure(format!(
                "camera {}: open session lost its resolution",
                self.camera_id
            ))
        })?;
        match self.device.read() {
            Ok(data) => {
                self.frames_read += 1;
                Frame::new(
                    data,
                    resolution.width,
                    resolution.height,
                    self.device.channels(),
                    self.frames_read,
                )
            }
            Err(e) => {
                self.state = SessionState::Faulted;
                Err(DetectorError::ReadFailure(format!(
                    "camera {}: {e:#}",
                    self.camera_id
                )))
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution() -> Resolution {
        Resolution {
            width: 8,
            height: 8,
        }
    }

    fn frame_step(value: u8) -> ScriptStep {
        ScriptStep::Frame(vec![value; 8 * 8 * 3])
    }

    #[test]
    fn read_requires_an_open_session() {
        let device = ScriptedDevice::new(resolution(), vec![frame_step(1)]);
        let mut source = CameraSource::new("cam0", Box::new(device));
        let err = source.read_frame().unwrap_err();
        assert!(matches!(err, DetectorError::ReadFailure(_)));
        assert_eq!(source.state(), SessionState::Closed);
    }

    #[test]
    fn successful_reads_increment_sequence_numbers() {
        let device = ScriptedDevice::new(resolution(), vec![frame_step(1), frame_step(2)]);
        let mut source = CameraSource::new("cam0", Box::new(device));
        source.open().expect("open");

        let first = source.read_frame().expect("read");
        let second = source.read_frame().expect("read");
        assert_eq!(first.seq(), 1);
        assert_eq!(second.seq(), 2);
        assert_eq!(source.state(), SessionState::Open);
    }

    #[test]
    fn read_failure_faults_the_session() {
        let device = ScriptedDevice::new(
            resolution(),
            vec![ScriptStep::Fail("sensor timeout".into())],
        );
        let mut source = CameraSource::new("cam0", Box::new(device));
        source.open().expect("open");

        let err = source.read_frame().unwrap_err();
        assert!(matches!(err, DetectorError::ReadFailure(_)));
        assert_eq!(source.state(), SessionState::Faulted);
    }

    #[test]
    fn faulted_session_must_close_before_reopen() {
        let device = ScriptedDevice::new(
            resolution(),
            vec![ScriptStep::Fail("sensor timeout".into()), frame_step(3)],
        );
        let mut source = CameraSource::new("cam0", Box::new(device));
        source.open().expect("open");
        source.read_frame().unwrap_err();

        let err = source.open().unwrap_err();
        assert!(matches!(err, DetectorError::DeviceUnavailable(_)));

        source.close();
        source.open().expect("reopen after close");
        let frame = source.read_frame().expect("read after recovery");
        // Sequence numbers continue across the reopen.
        assert_eq!(frame.seq(), 1);
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let device = ScriptedDevice::new(resolution(), vec![frame_step(1)]);
        let stats = device.stats();
        let mut source = CameraSource::new("cam0", Box::new(device));

        source.close();
        source.close();
        assert_eq!(stats.closes(), 0);

        source.open().expect("open");
        source.open().expect("second open is a no-op");
        assert_eq!(stats.opens(), 1);

        source.close();
        source.close();
        assert_eq!(stats.closes(), 1);
    }

    #[test]
    fn failing_device_open_is_device_unavailable() {
        let device =
            ScriptedDevice::new(resolution(), vec![frame_step(1)]).with_failing_opens(1);
        let mut source = CameraSource::new("cam0", Box::new(device));
        let err = source.open().unwrap_err();
        assert!(matches!(err, DetectorError::DeviceUnavailable(_)));
        assert_eq!(source.state(), SessionState::Closed);

        source.open().expect("second attempt succeeds");
    }
}
