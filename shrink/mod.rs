//! # Shrinkage Estimation Engine
//!
//! James-Stein and Ledoit-Wolf type shrinkage estimators for high-dimensional,
//! low-sample-size data. The engine never forms a `p x p` correlation matrix:
//! everything that touches the correlation structure goes through a
//! rank-revealing SVD of the standardized data, so costs scale with
//! `min(n, p)` rather than with `p`.
//!
//! Leaf-first:
//!
//! - [`moments`]: weighted means, variances and standardization.
//! - [`svd`]: positive-singular-value SVD with three shape-dependent strategies.
//! - [`intensity`]: analytic shrinkage intensities for frequencies, variances
//!   and correlations.
//! - [`variance`]: variance vector shrinkage toward the median.
//! - [`powcor`]: `R_shrink^alpha * Y` without materializing `R_shrink`.

use thiserror::Error;

pub mod intensity;
pub mod moments;
pub mod powcor;
pub mod svd;
pub mod variance;

pub use intensity::{
    Intensity, ShrinkageIntensity, clamp_unit, estimate_lambda_cor, estimate_lambda_freq,
    estimate_lambda_var, shrink_frequencies,
};
pub use moments::{SampleWeights, Standardized, WeightedMoments, median, standardize, weighted_moments};
pub use powcor::{CorrelationProjection, crossprod_powcor_shrink};
pub use svd::{PositiveSvd, SvdStrategy, positive_svd, positive_svd_with};
pub use variance::{ShrunkVariances, var_shrink};

/// Errors raised by the shrinkage engine.
///
/// `Decomposition` is always propagated from here; deciding whether a failed
/// decomposition is fatal belongs to the caller.
#[derive(Error, Debug)]
pub enum ShrinkageError {
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}.")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{context} requires at least {required} samples, but only {found} were provided.")]
    InsufficientSamples {
        context: &'static str,
        required: usize,
        found: usize,
    },

    #[error("Invalid sample weights: {reason}.")]
    InvalidWeights { reason: &'static str },

    #[error("Eigen/singular value decomposition failed to converge: {0}")]
    Decomposition(#[from] ndarray_linalg::error::LinalgError),

    #[error("The SVD routine returned without the requested singular vectors.")]
    MissingSingularVectors,
}

impl ShrinkageError {
    /// `true` when the error comes from a failed eigen or singular value
    /// decomposition rather than from a contract violation.
    pub fn is_decomposition_failure(&self) -> bool {
        matches!(
            self,
            ShrinkageError::Decomposition(_) | ShrinkageError::MissingSingularVectors
        )
    }
}
