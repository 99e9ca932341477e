//! Display collaborators.
//!
//! Presentation must never stall the acquisition loop, so `present` is
//! infallible; a display that cannot render drops the frame and logs at
//! debug. There is no GUI toolkit in this stack: `PreviewDisplay` stands in
//! for a window by overwriting a preview JPEG that any image viewer can
//! follow.

use std::path::PathBuf;

use crate::frame::Frame;
use crate::sink::write_jpeg;

/// Presentation collaborator for live frames.
pub trait FrameDisplay {
    fn present(&mut self, frame: &Frame);
}

/// Used when `show_window` is off.
pub struct NullDisplay;

impl FrameDisplay for NullDisplay {
    fn present(&mut self, _frame: &Frame) {}
}

/// Best-effort preview: overwrites a JPEG with the latest presented frame.
pub struct PreviewDisplay {
    path: PathBuf,
}

impl PreviewDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameDisplay for PreviewDisplay {
    fn present(&mut self, frame: &Frame) {
        if let Err(e) = write_jpeg(&self.path, frame) {
            log::debug!("preview write to {} failed: {e:#}", self.path.display());
        }
    }
}
