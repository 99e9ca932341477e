//! Evidence persistence.
//!
//! `FrameSink` accepts `(identifier, frame)` pairs and stores them durably.
//! Storage is best-effort from the loop's point of view: the orchestrator
//! logs a failed store and keeps running. `DirectoryFrameSink` writes JPEG
//! files keyed by the identifier; `InMemoryFrameSink` is a shared-handle sink
//! for tests.

use anyhow::{bail, Context, Result};
use image::{ExtendedColorType, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::frame::Frame;

/// Durable storage for evidence frames.
pub trait FrameSink {
    fn store(&mut self, id: &str, frame: &Frame) -> Result<()>;
}

/// Writes each frame to `<dir>/<id>.jpg`.
pub struct DirectoryFrameSink {
    dir: PathBuf,
}

impl DirectoryFrameSink {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create evidence directory {}", dir.display()))?;
        Ok(Self { dir })
    }
}

impl FrameSink for DirectoryFrameSink {
    fn store(&mut self, id: &str, frame: &Frame) -> Result<()> {
        let path = self.dir.join(format!("{id}.jpg"));
        write_jpeg(&path, frame).with_context(|| format!("store evidence {}", path.display()))
    }
}

pub(crate) fn write_jpeg(path: &Path, frame: &Frame) -> Result<()> {
    let color = match frame.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        c => bail!("cannot encode {c}-channel frame as JPEG"),
    };
    image::save_buffer_with_format(
        path,
        frame.data(),
        frame.width(),
        frame.height(),
        color,
        ImageFormat::Jpeg,
    )?;
    Ok(())
}

/// Test sink. Clones share the same store, so a test can keep a handle while
/// the detector owns the sink.
#[derive(Clone, Default)]
pub struct InMemoryFrameSink {
    entries: Arc<Mutex<Vec<(String, Frame)>>>,
}

impl InMemoryFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<(String, Frame)> {
        self.entries.lock().expect("sink lock").clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("sink lock")
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("sink lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSink for InMemoryFrameSink {
    fn store(&mut self, id: &str, frame: &Frame) -> Result<()> {
        self.entries
            .lock()
            .expect("sink lock")
            .push((id.to_string(), frame.clone()));
        Ok(())
    }
}
