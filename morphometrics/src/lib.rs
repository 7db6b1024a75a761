//! Axon and myelin morphometrics from segmentation masks.
//!
//! This crate turns the output of an upstream axon/myelin segmentation step
//! into per-axon measurements (diameters, areas, g-ratio, shape descriptors),
//! sample-level aggregate statistics, and a diagnostic diameter map.
//!
//! # Module Organization
//!
//! - **config**: Thresholds, fitted-shape mode and file naming conventions
//! - **error**: Error taxonomy and the exit-code policy of the binaries
//! - **image_proc**: Image I/O, mask thresholding, labeling, region properties
//!   and overlay rendering
//! - **engine**: The morphometrics engine consumed by the pipeline
//! - **pixel_size**: Micrometer-per-pixel calibration lookup
//! - **export**: Spreadsheet, aggregate summary and diameter map persistence
//! - **pipeline**: The single pipeline shared by both command line tools

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod image_proc;
pub mod pipeline;
pub mod pixel_size;

pub use config::{AxonShape, MorphometricsConfig, PredictionThresholds};
pub use engine::{
    AggregateMorphometrics, AxonMorphometrics, MorphometricsEngine, RegionPropsEngine,
};
pub use error::{MorphometricsError, Result};
pub use pipeline::{
    launch_morphometrics_computation, run, MaskSource, OutputTarget, PipelineReport,
    PipelineRequest,
};
pub use pixel_size::{resolve_pixel_size, PixelSize};
