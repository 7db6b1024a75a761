//! Test helpers for morphometrics
//!
//! Builds synthetic nerve samples: concentric axon/myelin fibers rendered as
//! a three-level prediction or as pre-rasterized binary masks, written into
//! a temporary sample folder laid out the way the command line tools expect.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use tempfile::TempDir;

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to create sample folder: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write fixture image: {0}")]
    Image(#[from] image::ImageError),
}

/// Prediction intensity of axon pixels
pub const AXON_VALUE: u8 = 255;
/// Prediction intensity of myelin pixels
pub const MYELIN_VALUE: u8 = 127;

/// A circular axon surrounded by a myelin ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fiber {
    /// Center as (row, col)
    pub center: (f64, f64),
    pub axon_radius: f64,
    pub fiber_radius: f64,
}

impl Fiber {
    pub fn new(center: (f64, f64), axon_radius: f64, fiber_radius: f64) -> Self {
        Self {
            center,
            axon_radius,
            fiber_radius,
        }
    }

    fn distance(&self, row: u32, col: u32) -> f64 {
        let dr = row as f64 - self.center.0;
        let dc = col as f64 - self.center.1;
        (dr * dr + dc * dc).sqrt()
    }

    pub fn is_axon(&self, row: u32, col: u32) -> bool {
        self.distance(row, col) <= self.axon_radius
    }

    pub fn is_myelin(&self, row: u32, col: u32) -> bool {
        let d = self.distance(row, col);
        d > self.axon_radius && d <= self.fiber_radius
    }
}

/// Three well separated fibers in a 120 x 90 image.
pub fn default_fibers() -> Vec<Fiber> {
    vec![
        Fiber::new((25.0, 25.0), 6.0, 10.0),
        Fiber::new((30.0, 80.0), 9.0, 15.0),
        Fiber::new((65.0, 45.0), 7.0, 14.0),
    ]
}

pub const DEFAULT_WIDTH: u32 = 120;
pub const DEFAULT_HEIGHT: u32 = 90;

/// Render fibers as a prediction: axon 255, myelin 127, background 0.
pub fn fiber_prediction(width: u32, height: u32, fibers: &[Fiber]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if fibers.iter().any(|f| f.is_axon(y, x)) {
            Luma([AXON_VALUE])
        } else if fibers.iter().any(|f| f.is_myelin(y, x)) {
            Luma([MYELIN_VALUE])
        } else {
            Luma([0])
        }
    })
}

/// Render fibers as binary (0/255) axon and myelin masks.
pub fn fiber_masks(width: u32, height: u32, fibers: &[Fiber]) -> (GrayImage, GrayImage) {
    let axon = GrayImage::from_fn(width, height, |x, y| {
        Luma([if fibers.iter().any(|f| f.is_axon(y, x)) { 255 } else { 0 }])
    });
    let myelin = GrayImage::from_fn(width, height, |x, y| {
        let member =
            !fibers.iter().any(|f| f.is_axon(y, x)) && fibers.iter().any(|f| f.is_myelin(y, x));
        Luma([if member { 255 } else { 0 }])
    });
    (axon, myelin)
}

/// A temporary sample folder holding `<stem>.png` and its companions.
pub struct SampleDir {
    dir: TempDir,
    stem: String,
    width: u32,
    height: u32,
}

impl SampleDir {
    pub fn new(stem: &str) -> Result<Self, TestHelperError> {
        Self::with_size(stem, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn with_size(stem: &str, width: u32, height: u32) -> Result<Self, TestHelperError> {
        Ok(Self {
            dir: TempDir::new()?,
            stem: stem.to_string(),
            width,
            height,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn image_path(&self) -> PathBuf {
        self.path().join(format!("{}.png", self.stem))
    }

    pub fn axon_mask_path(&self) -> PathBuf {
        self.path().join(format!("{}_seg-axon.png", self.stem))
    }

    pub fn myelin_mask_path(&self) -> PathBuf {
        self.path().join(format!("{}_seg-myelin.png", self.stem))
    }

    pub fn prediction_path(&self) -> PathBuf {
        self.path().join(format!("{}_seg-axonmyelin.png", self.stem))
    }

    /// Write a flat gray microscopy image.
    pub fn write_image(&self) -> Result<PathBuf, TestHelperError> {
        let path = self.image_path();
        GrayImage::from_pixel(self.width, self.height, Luma([96])).save(&path)?;
        Ok(path)
    }

    pub fn write_axon_mask(&self, fibers: &[Fiber]) -> Result<PathBuf, TestHelperError> {
        let path = self.axon_mask_path();
        fiber_masks(self.width, self.height, fibers).0.save(&path)?;
        Ok(path)
    }

    pub fn write_myelin_mask(&self, fibers: &[Fiber]) -> Result<PathBuf, TestHelperError> {
        let path = self.myelin_mask_path();
        fiber_masks(self.width, self.height, fibers).1.save(&path)?;
        Ok(path)
    }

    pub fn write_prediction(&self, fibers: &[Fiber]) -> Result<PathBuf, TestHelperError> {
        let path = self.prediction_path();
        fiber_prediction(self.width, self.height, fibers).save(&path)?;
        Ok(path)
    }

    /// Write `pixel_size_in_micrometer.txt` with the given contents.
    pub fn write_pixel_size(&self, contents: &str) -> Result<PathBuf, TestHelperError> {
        let path = self.path().join("pixel_size_in_micrometer.txt");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Image plus both masks of [`default_fibers`].
    pub fn with_default_masks(stem: &str) -> Result<Self, TestHelperError> {
        let sample = Self::new(stem)?;
        let fibers = default_fibers();
        sample.write_image()?;
        sample.write_axon_mask(&fibers)?;
        sample.write_myelin_mask(&fibers)?;
        Ok(sample)
    }
}
