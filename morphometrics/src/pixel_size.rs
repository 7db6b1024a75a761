//! Micrometer-per-pixel calibration.
//!
//! The pixel size comes either from the command line or from a sidecar text
//! file in the sample folder containing a single float.

use std::path::Path;

use log::info;

use crate::error::{MorphometricsError, Result};

/// Validated pixel size in micrometers per pixel.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PixelSize(f64);

impl PixelSize {
    /// Wrap a value, rejecting zero, negative and non-finite sizes.
    pub fn new(micrometers: f64) -> Result<Self> {
        if micrometers.is_finite() && micrometers > 0.0 {
            Ok(Self(micrometers))
        } else {
            Err(MorphometricsError::InvalidPixelSize {
                value: micrometers.to_string(),
            })
        }
    }

    pub fn micrometers(&self) -> f64 {
        self.0
    }

    /// Convert a length in pixels to micrometers.
    pub fn length(&self, pixels: f64) -> f64 {
        pixels * self.0
    }

    /// Convert an area in pixels to square micrometers.
    pub fn area(&self, pixels: f64) -> f64 {
        pixels * self.0 * self.0
    }
}

impl std::str::FromStr for PixelSize {
    type Err = MorphometricsError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| MorphometricsError::InvalidPixelSize {
                value: trimmed.to_string(),
            })?;
        Self::new(value)
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} um/px", self.0)
    }
}

/// Read the pixel size sidecar file in `folder`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_pixel_size_file(folder: &Path, file_name: &str) -> Result<Option<PixelSize>> {
    let path = folder.join(file_name);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| {
        MorphometricsError::PixelSizeFile {
            path: path.clone(),
            source,
        }
    })?;
    let pixel_size = contents.parse::<PixelSize>()?;
    info!("Read pixel size {pixel_size} from {path:?}");
    Ok(Some(pixel_size))
}

/// Resolve the pixel size for a sample.
///
/// The explicit value wins; otherwise the sidecar file in `folder` is used.
/// Fails with [`MorphometricsError::MissingPixelSize`] when neither exists.
pub fn resolve_pixel_size(
    explicit: Option<f64>,
    folder: &Path,
    file_name: &str,
) -> Result<PixelSize> {
    if let Some(value) = explicit {
        return PixelSize::new(value);
    }

    read_pixel_size_file(folder, file_name)?.ok_or_else(|| {
        MorphometricsError::MissingPixelSize {
            folder: folder.to_path_buf(),
            file_name: file_name.to_string(),
        }
    })
}
