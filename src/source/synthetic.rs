//! Synthetic capture devices.
//!
//! `SyntheticDevice` backs `stub://` camera ids: a deterministic scene with a
//! periodic moving block, so the daemon can run and trigger without hardware.
//! `ScriptedDevice` replays a fixed sequence of read outcomes and counts
//! open/read/close calls; the loop and session tests are built on it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::bail;

use super::CaptureDevice;
use crate::frame::Resolution;

// How the synthetic scene cycles: `BLOCK_PERIOD` frames of static background,
// then the block sweeps across for `BLOCK_VISIBLE` frames.
const BLOCK_PERIOD: u64 = 100;
const BLOCK_VISIBLE: u64 = 20;

/// Deterministic scene generator for `stub://` camera ids.
pub struct SyntheticDevice {
    name: String,
    resolution: Resolution,
    frame_count: u64,
    opened: bool,
}

impl SyntheticDevice {
    pub fn new(name: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            name: name.into(),
            resolution,
            frame_count: 0,
            opened: false,
        }
    }

    /// Static background with a bright block sweeping through periodically.
    fn render(&self) -> Vec<u8> {
        let Resolution { width, height } = self.resolution;
        let mut pixels = vec![0u8; (width * height * 3) as usize];

        for y in 0..height {
            for x in 0..width {
                let base = ((y * width + x) * 3) as usize;
                let shade = (((x / 8) + (y / 8)) % 8) as u8 * 8 + 48;
                pixels[base] = shade;
                pixels[base + 1] = shade;
                pixels[base + 2] = shade;
            }
        }

        let phase = self.frame_count % BLOCK_PERIOD;
        if phase < BLOCK_VISIBLE {
            let block_w = width / 4;
            let block_h = height / 4;
            let span = width.saturating_sub(block_w).max(1) as u64;
            let left = ((phase * span) / BLOCK_VISIBLE) as u32;
            let top = height / 3;
            for y in top..(top + block_h).min(height) {
                for x in left..(left + block_w).min(width) {
                    let base = ((y * width + x) * 3) as usize;
                    pixels[base] = 250;
                    pixels[base + 1] = 250;
                    pixels[base + 2] = 250;
                }
            }
        }

        pixels
    }
}

impl CaptureDevice for SyntheticDevice {
    fn open(&mut self) -> anyhow::Result<Resolution> {
        self.opened = true;
        log::info!(
            "SyntheticDevice: {} open at {} (synthetic)",
            self.name,
            self.resolution
        );
        Ok(self.resolution)
    }

    fn read(&mut self) -> anyhow::Result<Vec<u8>> {
        if !self.opened {
            bail!("synthetic device {} is not open", self.name);
        }
        let pixels = self.render();
        self.frame_count += 1;
        Ok(pixels)
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

// ----------------------------------------------------------------------------
// Scripted device for tests
// ----------------------------------------------------------------------------

/// One scripted read outcome.
pub enum ScriptStep {
    Frame(Vec<u8>),
    Fail(String),
}

/// Open/read/close call counters, shared with the test that owns the script.
#[derive(Debug, Default)]
pub struct DeviceStats {
    opens: AtomicU32,
    reads: AtomicU32,
    closes: AtomicU32,
}

impl DeviceStats {
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::Relaxed)
    }
}

/// Capture device driven by a fixed script of read outcomes.
pub struct ScriptedDevice {
    resolution: Resolution,
    steps: VecDeque<ScriptStep>,
    stats: Arc<DeviceStats>,
    failing_opens: u32,
}

impl ScriptedDevice {
    pub fn new(resolution: Resolution, steps: Vec<ScriptStep>) -> Self {
        Self {
            resolution,
            steps: steps.into(),
            stats: Arc::new(DeviceStats::default()),
            failing_opens: 0,
        }
    }

    /// Make the next `count` open calls fail before opens start succeeding.
    pub fn with_failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = count;
        self
    }

    pub fn stats(&self) -> Arc<DeviceStats> {
        Arc::clone(&self.stats)
    }
}

impl CaptureDevice for ScriptedDevice {
    fn open(&mut self) -> anyhow::Result<Resolution> {
        self.stats.opens.fetch_add(1, Ordering::Relaxed);
        if self.failing_opens > 0 {
            self.failing_opens -= 1;
            bail!("scripted open failure");
        }
        Ok(self.resolution)
    }

    fn read(&mut self) -> anyhow::Result<Vec<u8>> {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);
        match self.steps.pop_front() {
            Some(ScriptStep::Frame(data)) => Ok(data),
            Some(ScriptStep::Fail(reason)) => bail!("{reason}"),
            None => bail!("script exhausted"),
        }
    }

    fn close(&mut self) {
        self.stats.closes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_device_is_deterministic() {
        let resolution = Resolution {
            width: 64,
            height: 48,
        };
        let mut a = SyntheticDevice::new("front", resolution);
        let mut b = SyntheticDevice::new("front", resolution);
        a.open().expect("open");
        b.open().expect("open");
        for _ in 0..8 {
            assert_eq!(a.read().expect("read"), b.read().expect("read"));
        }
    }

    #[test]
    fn synthetic_device_moves_the_block() {
        let resolution = Resolution {
            width: 64,
            height: 48,
        };
        let mut device = SyntheticDevice::new("front", resolution);
        device.open().expect("open");
        let first = device.read().expect("read");
        let second = device.read().expect("read");
        // The sweep is underway during the first frames of each period.
        assert_ne!(first, second);
    }

    #[test]
    fn synthetic_device_requires_open() {
        let mut device = SyntheticDevice::new(
            "front",
            Resolution {
                width: 8,
                height: 8,
            },
        );
        assert!(device.read().is_err());
        device.open().expect("open");
        assert!(device.read().is_ok());
        device.close();
        assert!(device.read().is_err());
    }

    #[test]
    fn scripted_device_replays_and_counts() {
        let resolution = Resolution {
            width: 2,
            height: 2,
        };
        let device = ScriptedDevice::new(
            resolution,
            vec![
                ScriptStep::Frame(vec![0; 12]),
                ScriptStep::Fail("boom".into()),
            ],
        );
        let stats = device.stats();
        let mut device = device;

        device.open().expect("open");
        assert!(device.read().is_ok());
        assert!(device.read().is_err());
        assert!(device.read().is_err()); // exhausted
        device.close();

        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.reads(), 3);
        assert_eq!(stats.closes(), 1);
    }
}
