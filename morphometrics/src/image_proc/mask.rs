//! Boolean class masks and the prediction thresholder.
//!
//! A prediction image encodes three classes by intensity: background, myelin
//! and axon. [`threshold_prediction`] splits it into two disjoint masks using
//! the configured [`PredictionThresholds`]. Values below the myelin range fall
//! into neither mask.

use ndarray::{Array2, ArrayView2, Zip};

use crate::config::PredictionThresholds;
use crate::error::{MorphometricsError, Result};

/// Immutable per-pixel class membership, indexed `[row, col]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Mask {
    pub fn from_array(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// An all-false mask of the given `(height, width)`.
    pub fn empty(dim: (usize, usize)) -> Self {
        Self {
            data: Array2::from_elem(dim, false),
        }
    }

    /// `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[[row, col]]
    }

    /// Number of member pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    /// Pixel-wise OR of two masks of equal dimensions.
    pub fn union(&self, other: &Mask) -> Result<Mask> {
        check_dim("mask", self.dim(), other.dim())?;
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a || b);
        Ok(Mask { data })
    }
}

/// Axon and myelin masks of one sample, guaranteed to share dimensions.
#[derive(Debug, Clone)]
pub struct AxonMasks {
    pub axon: Mask,
    pub myelin: Mask,
}

impl AxonMasks {
    pub fn new(axon: Mask, myelin: Mask) -> Result<Self> {
        check_dim("myelin mask", axon.dim(), myelin.dim())?;
        Ok(Self { axon, myelin })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.axon.dim()
    }

    /// Fail unless both masks match the reference image dimensions.
    pub fn ensure_matches(&self, reference: (usize, usize)) -> Result<()> {
        check_dim("axon mask", reference, self.dim())
    }
}

pub(crate) fn check_dim(what: &str, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MorphometricsError::DimensionMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}

/// Split a single-channel prediction into axon and myelin masks.
///
/// axon = `v > axon_min_exclusive`; myelin = `myelin_min <= v <= axon_min_exclusive`.
pub fn threshold_prediction(
    prediction: &ArrayView2<u8>,
    thresholds: &PredictionThresholds,
) -> AxonMasks {
    let axon = prediction.mapv(|v| v > thresholds.axon_min_exclusive);
    let myelin =
        prediction.mapv(|v| v >= thresholds.myelin_min && v <= thresholds.axon_min_exclusive);

    AxonMasks {
        axon: Mask::from_array(axon),
        myelin: Mask::from_array(myelin),
    }
}
