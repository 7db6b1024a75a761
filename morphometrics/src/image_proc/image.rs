//! Conversions between ndarray arrays and image crate buffers.
//!
//! - **ndarray**: matrix indexing `[row, col]` = `[y, x]`, dimensions `(height, width)`
//! - **image crate**: graphics indexing `(x, y)`, dimensions `(width, height)`

use image::GrayImage;
use ndarray::Array2;

/// Convert a GrayImage into an `Array2<u8>` of shape `(height, width)`.
pub fn gray_image_to_array2(img: &GrayImage) -> Array2<u8> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        img.get_pixel(col as u32, row as u32).0[0]
    })
}
