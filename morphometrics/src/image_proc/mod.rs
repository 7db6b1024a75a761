//! Image processing for axon/myelin morphometrics.
//!
//! # Module Organization
//!
//! - **io**: Reading prediction images, pre-rasterized masks and the
//!   microscopy image
//! - **image**: Conversion from image crate buffers to ndarray arrays
//! - **mask**: Boolean masks and the prediction thresholder
//! - **detection**: Connected component labeling
//! - **regionprops**: Moment-based shape descriptors per labeled region
//! - **overlay**: Diameter map rendering
//!
//! All rasters use ndarray indexing `[row, col]` with dimensions
//! `(height, width)`; conversions to the image crate's `(x, y)` convention
//! happen only in **image** and **io**.

pub mod detection;
pub mod image;
pub mod io;
pub mod mask;
pub mod overlay;
pub mod regionprops;

pub use detection::{connected_components, label_count, Connectivity};
pub use image::gray_image_to_array2;
pub use io::{image_dimensions, load_binary_mask, load_gray_image, load_prediction};
pub use mask::{threshold_prediction, AxonMasks, Mask};
pub use overlay::{draw_diameter_map, overlay_to_image, DiameterMapEntry, Outline};
pub use regionprops::{regionprops, RegionProps};
