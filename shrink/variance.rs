use super::ShrinkageError;
use super::intensity::{Intensity, ShrinkageIntensity, estimate_lambda_var};
use super::moments::{SampleWeights, median, weighted_moments};
use ndarray::{Array1, ArrayView2};

/// Variance vector shrunk toward its median, and the intensity used.
#[derive(Debug, Clone)]
pub struct ShrunkVariances {
    pub variances: Array1<f64>,
    pub lambda: ShrinkageIntensity,
}

/// Shrinkage estimate of the per-feature variances of `x`:
/// `lambda * median(v) + (1 - lambda) * v`.
///
/// With `Intensity::Auto` the intensity is estimated from `x`, which needs at
/// least three samples; a fixed intensity works for any sample size.
pub fn var_shrink(
    x: ArrayView2<f64>,
    lambda_var: Intensity,
    weights: Option<&SampleWeights>,
) -> Result<ShrunkVariances, ShrinkageError> {
    let w = SampleWeights::resolve(weights, x.nrows())?;
    let lambda = lambda_var.resolve(|| estimate_lambda_var(x, Some(&w)))?;

    let empirical = weighted_moments(x, &w)?.variance;
    let target = median(empirical.view());
    let variances = empirical.mapv(|v| lambda.value * target + (1.0 - lambda.value) * v);

    Ok(ShrunkVariances { variances, lambda })
}
