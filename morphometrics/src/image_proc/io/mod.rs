//! Image I/O for microscopy samples.
//!
//! Reads the microscopy image, the grayscale prediction produced by the
//! segmentation step and pre-rasterized binary masks. No resizing or
//! intensity normalization happens here: callers are responsible for
//! checking that rasters are co-registered.

use std::path::Path;

use image::GrayImage;
use log::{debug, error, warn};
use ndarray::Array2;

use super::image::gray_image_to_array2;
use super::mask::Mask;
use crate::error::{MorphometricsError, Result};

/// Open any supported image and convert it to 8-bit grayscale.
///
/// Read failures are logged before being returned so the failing path is
/// visible even when the caller only reports the top-level error.
pub fn load_gray_image(path: &Path) -> Result<GrayImage> {
    match image::open(path) {
        Ok(img) => {
            let gray = img.to_luma8();
            debug!(
                "Loaded {:?} ({}x{})",
                path,
                gray.width(),
                gray.height()
            );
            Ok(gray)
        }
        Err(source) => {
            error!("Failed to read image {path:?}: {source}");
            Err(MorphometricsError::ImageRead {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Load a grayscale prediction image as `Array2<u8>` indexed `[row, col]`.
pub fn load_prediction(path: &Path) -> Result<Array2<u8>> {
    Ok(gray_image_to_array2(&load_gray_image(path)?))
}

/// Load a pre-rasterized binary mask; any non-zero pixel is a member.
pub fn load_binary_mask(path: &Path) -> Result<Mask> {
    let pixels = load_prediction(path)?;
    Ok(Mask::from_array(pixels.mapv(|v| v > 0)))
}

/// Raster size as `(height, width)`, read from the file header only.
///
/// Returns `None` when the header cannot be read.
pub fn image_dimensions(path: &Path) -> Option<(usize, usize)> {
    match image::image_dimensions(path) {
        Ok((width, height)) => Some((height as usize, width as usize)),
        Err(e) => {
            warn!("Cannot read dimensions of {path:?}: {e}");
            None
        }
    }
}
