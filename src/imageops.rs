//! Image-processing capability consumed by the analyzer.
//!
//! `ImageOps` is the seam for the image-processing primitives the decision
//! pipeline needs. Every operation is a pure function of its inputs: same
//! frames in, bit-identical frames out, no hidden state. `PixelEngine` is the
//! supplied implementation, built on `image`-crate buffers.
//!
//! All single-channel operations expect an 8-bit grayscale frame and fail
//! with a `Pipeline` error otherwise; a wrong channel count this deep in the
//! pipeline means an upstream bug, not a recoverable condition.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};

use crate::error::{DetectorError, Result};
use crate::frame::Frame;

/// Image-processing primitives used by the motion pipeline.
pub trait ImageOps {
    /// Pixel-wise absolute difference of two frames with identical geometry.
    fn absolute_diff(&self, a: &Frame, b: &Frame) -> Result<Frame>;

    /// Reduce an RGB frame to single-channel grayscale. Grayscale input
    /// passes through unchanged.
    fn grayscale(&self, frame: &Frame) -> Result<Frame>;

    /// Two-level image: samples above `cut` become 255, the rest 0.
    fn binary_threshold(&self, frame: &Frame, cut: u8) -> Result<Frame>;

    /// Bilinear downscale to the given dimensions.
    fn resize(&self, frame: &Frame, width: u32, height: u32) -> Result<Frame>;

    /// Gaussian blur with the given sigma.
    fn gaussian_blur(&self, frame: &Frame, sigma: f32) -> Result<Frame>;

    /// Morphological dilation with a 3x3 structuring element, applied
    /// `iterations` times.
    fn dilate(&self, frame: &Frame, iterations: u32) -> Result<Frame>;

    /// Areas of the top-level foreground regions (non-zero samples,
    /// 8-connected) of a filtered binary frame, in pixels. Nested structure
    /// inside a region is not separately counted.
    fn external_regions(&self, frame: &Frame) -> Result<Vec<f64>>;
}

/// CPU implementation of `ImageOps` on `image`-crate buffers.
pub struct PixelEngine;

impl ImageOps for PixelEngine {
    fn absolute_diff(&self, a: &Frame, b: &Frame) -> Result<Frame> {
        if a.resolution() != b.resolution() || a.channels() != b.channels() {
            return Err(DetectorError::Pipeline(format!(
                "absolute_diff geometry mismatch: {}x{} vs {}x{}",
                a.resolution(),
                a.channels(),
                b.resolution(),
                b.channels()
            )));
        }
        let diff: Vec<u8> = a
            .data()
            .iter()
            .zip(b.data())
            .map(|(x, y)| x.abs_diff(*y))
            .collect();
        Frame::new(diff, a.width(), a.height(), a.channels(), b.seq())
    }

    fn grayscale(&self, frame: &Frame) -> Result<Frame> {
        match frame.channels() {
            1 => Ok(frame.clone()),
            3 => {
                let rgb = rgb_of(frame)?;
                let gray = imageops::grayscale(&rgb);
                frame_from_gray(gray, frame.seq())
            }
            c => Err(DetectorError::Pipeline(format!(
                "grayscale expects 1 or 3 channels, got {c}"
            ))),
        }
    }

    fn binary_threshold(&self, frame: &Frame, cut: u8) -> Result<Frame> {
        let gray = gray_of(frame)?;
        let out: Vec<u8> = gray
            .into_raw()
            .into_iter()
            .map(|p| if p > cut { 255 } else { 0 })
            .collect();
        Frame::new(out, frame.width(), frame.height(), 1, frame.seq())
    }

    fn resize(&self, frame: &Frame, width: u32, height: u32) -> Result<Frame> {
        let gray = gray_of(frame)?;
        let scaled = imageops::resize(&gray, width, height, FilterType::Triangle);
        frame_from_gray(scaled, frame.seq())
    }

    fn gaussian_blur(&self, frame: &Frame, sigma: f32) -> Result<Frame> {
        let gray = gray_of(frame)?;
        let blurred = imageops::blur(&gray, sigma);
        frame_from_gray(blurred, frame.seq())
    }

    fn dilate(&self, frame: &Frame, iterations: u32) -> Result<Frame> {
        let mut img = gray_of(frame)?;
        for _ in 0..iterations {
            img = dilate_once(&img);
        }
        frame_from_gray(img, frame.seq())
    }

    fn external_regions(&self, frame: &Frame) -> Result<Vec<f64>> {
        let gray = gray_of(frame)?;
        Ok(region_areas(&gray))
    }
}

// ----------------------------------------------------------------------------
// Buffer conversions
// ----------------------------------------------------------------------------

fn gray_of(frame: &Frame) -> Result<GrayImage> {
    if frame.channels() != 1 {
        return Err(DetectorError::Pipeline(format!(
            "expected grayscale frame, got {} channels",
            frame.channels()
        )));
    }
    GrayImage::from_raw(frame.width(), frame.height(), frame.data().to_vec()).ok_or_else(|| {
        DetectorError::Pipeline(format!(
            "grayscale buffer does not fit {}",
            frame.resolution()
        ))
    })
}

fn rgb_of(frame: &Frame) -> Result<RgbImage> {
    if frame.channels() != 3 {
        return Err(DetectorError::Pipeline(format!(
            "expected RGB frame, got {} channels",
            frame.channels()
        )));
    }
    RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec()).ok_or_else(|| {
        DetectorError::Pipeline(format!("RGB buffer does not fit {}", frame.resolution()))
    })
}

fn frame_from_gray(img: GrayImage, seq: u64) -> Result<Frame> {
    let (width, height) = img.dimensions();
    Frame::new(img.into_raw(), width, height, 1, seq)
}

// ----------------------------------------------------------------------------
// Morphology and region extraction
// ----------------------------------------------------------------------------

fn dilate_once(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut max = 0u8;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
                        max = max.max(img.get_pixel(nx as u32, ny as u32)[0]);
                    }
                }
            }
            out.put_pixel(x, y, Luma([max]));
        }
    }
    out
}

/// Flood-fill over non-zero samples, 8-connected. Each connected component is
/// one external region; its area is its pixel count.
fn region_areas(img: &GrayImage) -> Vec<f64> {
    let (width, height) = img.dimensions();
    let w = width as i64;
    let h = height as i64;
    let index = |x: i64, y: i64| (y * w + x) as usize;

    let mut visited = vec![false; (width * height) as usize];
    let mut areas = Vec::new();
    let mut stack: Vec<(i64, i64)> = Vec::new();

    for start_y in 0..h {
        for start_x in 0..w {
            if visited[index(start_x, start_y)]
                || img.get_pixel(start_x as u32, start_y as u32)[0] == 0
            {
                continue;
            }
            visited[index(start_x, start_y)] = true;
            stack.push((start_x, start_y));
            let mut area = 0u64;
            while let Some((x, y)) = stack.pop() {
                area += 1;
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x + dx;
                        let ny = y + dy;
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        if visited[index(nx, ny)] || img.get_pixel(nx as u32, ny as u32)[0] == 0 {
                            continue;
                        }
                        visited[index(nx, ny)] = true;
                        stack.push((nx, ny));
                    }
                }
            }
            areas.push(area as f64);
        }
    }
    areas
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
