//! Configuration for morphometrics extraction.
//!
//! Holds the prediction intensity protocol, the fitted-shape mode and the
//! file naming conventions shared by both command line tools. Stored as
//! pretty-printed JSON; every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Shape fitted to each axon when deriving diameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxonShape {
    /// Diameter of the circle with the same area as the object.
    #[default]
    Circle,
    /// Minor axis of the ellipse with the same second moments as the object.
    Ellipse,
}

impl std::str::FromStr for AxonShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "circle" => Ok(AxonShape::Circle),
            "ellipse" => Ok(AxonShape::Ellipse),
            _ => Err(format!(
                "Unknown axon shape: {}. Valid options: circle, ellipse",
                s
            )),
        }
    }
}

impl std::fmt::Display for AxonShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxonShape::Circle => write!(f, "circle"),
            AxonShape::Ellipse => write!(f, "ellipse"),
        }
    }
}

/// Three-level intensity protocol of prediction images.
///
/// Background is below `myelin_min`, myelin lies in
/// `[myelin_min, axon_min_exclusive]` and axon is strictly above
/// `axon_min_exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionThresholds {
    /// Lowest intensity classified as myelin
    pub myelin_min: u8,
    /// Highest intensity classified as myelin; anything above is axon
    pub axon_min_exclusive: u8,
}

impl Default for PredictionThresholds {
    fn default() -> Self {
        Self {
            myelin_min: 50,
            axon_min_exclusive: 200,
        }
    }
}

/// Complete configuration of a morphometrics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphometricsConfig {
    pub thresholds: PredictionThresholds,
    pub axon_shape: AxonShape,
    /// Suffix appended to the image stem to find the axon mask
    pub axon_mask_suffix: String,
    /// Suffix appended to the image stem to find the myelin mask
    pub myelin_mask_suffix: String,
    /// Sidecar file holding the pixel size in micrometers
    pub pixel_size_file: String,
    /// Per-axon spreadsheet written in the sample folder
    pub morphometrics_file: String,
    /// Aggregate summary written in the sample folder
    pub aggregate_file: String,
    /// Diameter map written in the sample folder
    pub diameter_map_file: String,
}

impl Default for MorphometricsConfig {
    fn default() -> Self {
        Self {
            thresholds: PredictionThresholds::default(),
            axon_shape: AxonShape::default(),
            axon_mask_suffix: "_seg-axon.png".to_string(),
            myelin_mask_suffix: "_seg-myelin.png".to_string(),
            pixel_size_file: "pixel_size_in_micrometer.txt".to_string(),
            morphometrics_file: "axon_morphometrics.xlsx".to_string(),
            aggregate_file: "aggregate_morphometrics.txt".to_string(),
            diameter_map_file: "AxonDeepSeg_map-axondiameter.png".to_string(),
        }
    }
}

impl MorphometricsConfig {
    /// Load from a JSON file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.myelin_min > self.thresholds.axon_min_exclusive {
            return Err(ConfigError::Invalid(format!(
                "myelin_min ({}) must not exceed axon_min_exclusive ({})",
                self.thresholds.myelin_min, self.thresholds.axon_min_exclusive
            )));
        }

        let names = [
            ("axon_mask_suffix", &self.axon_mask_suffix),
            ("myelin_mask_suffix", &self.myelin_mask_suffix),
            ("pixel_size_file", &self.pixel_size_file),
            ("morphometrics_file", &self.morphometrics_file),
            ("aggregate_file", &self.aggregate_file),
            ("diameter_map_file", &self.diameter_map_file),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        if self.axon_mask_suffix == self.myelin_mask_suffix {
            return Err(ConfigError::Invalid(
                "axon and myelin mask suffixes must differ".to_string(),
            ));
        }

        Ok(())
    }
}
