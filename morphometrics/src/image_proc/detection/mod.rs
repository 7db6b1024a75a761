//! Object labeling on binary masks.
//!
//! - **thresholding**: Connected component labeling with union-find
//! - **aabb**: Pixel extents of labeled regions

pub mod aabb;
pub mod thresholding;

pub use aabb::AABB;
pub use thresholding::{connected_components, label_count, Connectivity};
