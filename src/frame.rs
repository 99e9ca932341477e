//! Frame values produced by the capture layer.
//!
//! A `Frame` is an immutable 2-D grid of pixel samples tagged with its
//! acquisition order. The diff pipeline always produces new derived frames;
//! nothing mutates a frame in place after creation. Pixel data lives behind
//! an `Arc`, so cloning a frame (to keep it as the previous frame, or to hand
//! it to the evidence sink) never copies pixels.

use std::fmt;
use std::sync::Arc;

use crate::error::{DetectorError, Result};

/// Native or scaled frame dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One captured (or derived) image sample.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    channels: u8,
    seq: u64,
}

impl Frame {
    /// Build a frame from raw interleaved samples.
    ///
    /// The buffer length must match `width * height * channels` exactly; a
    /// mismatch means the capture or pipeline layer produced garbage, which
    /// is a fatal `Pipeline` error.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, seq: u64) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if channels == 0 || data.len() != expected {
            return Err(DetectorError::Pipeline(format!(
                "frame buffer of {} bytes does not match {}x{}x{}",
                data.len(),
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            data: data.into(),
            width,
            height,
            channels,
            seq,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Acquisition order. Derived frames keep the sequence number of the
    /// capture they were computed from.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("seq", &self.seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_mismatched_buffer() {
        let err = Frame::new(vec![0u8; 10], 4, 4, 3, 1).unwrap_err();
        assert!(matches!(err, DetectorError::Pipeline(_)));

        let err = Frame::new(vec![0u8; 48], 4, 4, 0, 1).unwrap_err();
        assert!(matches!(err, DetectorError::Pipeline(_)));
    }

    #[test]
    fn frame_clone_shares_pixel_storage() {
        let frame = Frame::new(vec![7u8; 48], 4, 4, 3, 1).expect("frame");
        let clone = frame.clone();
        assert!(std::ptr::eq(frame.data().as_ptr(), clone.data().as_ptr()));
        assert_eq!(frame, clone);
    }

    #[test]
    fn frame_reports_dimensions() {
        let frame = Frame::new(vec![0u8; 6 * 4], 6, 4, 1, 9).expect("frame");
        assert_eq!(frame.resolution().to_string(), "6x4");
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.seq(), 9);
    }
}
