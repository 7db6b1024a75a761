//! Error types shared by the library and the command line tools.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Exit code for missing inputs: mask files or the pixel size.
pub const EXIT_MISSING_INPUT: u8 = 3;
/// Exit code for failures while writing results.
pub const EXIT_EXPORT_FAILED: u8 = 4;
/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Which mask of a sample an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    Axon,
    Myelin,
}

impl std::fmt::Display for MaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskKind::Axon => write!(f, "axon"),
            MaskKind::Myelin => write!(f, "myelin"),
        }
    }
}

/// Errors raised while computing or exporting morphometrics.
#[derive(Debug, Error)]
pub enum MorphometricsError {
    /// An input image could not be opened or decoded.
    #[error("failed to read image {path:?}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A pre-rasterized mask is not present next to the image.
    #[error(
        "segmented {kind} mask is not present in the image folder ({path:?}); \
         perform segmentation of the image first"
    )]
    MissingMask { kind: MaskKind, path: PathBuf },

    /// Neither a pixel size flag nor a sidecar file was available.
    #[error(
        "no pixel size is provided, and there is no {file_name} file in {folder:?}; \
         provide a pixel size (-s) or add the file containing the pixel size value"
    )]
    MissingPixelSize { folder: PathBuf, file_name: String },

    /// The pixel size is not a positive, finite number.
    #[error("invalid pixel size {value:?}: expected a positive number of micrometers")]
    InvalidPixelSize { value: String },

    /// The pixel size sidecar exists but cannot be read.
    #[error("failed to read pixel size file {path:?}")]
    PixelSizeFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two rasters that must be co-registered have different shapes.
    #[error("{what} has dimensions {actual:?} but {expected:?} was expected")]
    DimensionMismatch {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Results could not be written.
    #[error("cannot write {path:?}: {reason}")]
    Export { path: PathBuf, reason: String },

    /// Rendering the diameter map failed.
    #[error("failed to render overlay: {0}")]
    Overlay(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MorphometricsError {
    /// Process exit code for this error.
    ///
    /// Missing inputs exit with 3, export failures with 4, anything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            MorphometricsError::MissingMask { .. }
            | MorphometricsError::MissingPixelSize { .. } => EXIT_MISSING_INPUT,
            MorphometricsError::Export { .. } => EXIT_EXPORT_FAILED,
            _ => EXIT_FAILURE,
        }
    }

    pub(crate) fn export(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MorphometricsError::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = MorphometricsError> = std::result::Result<T, E>;
