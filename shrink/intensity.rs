//! # Analytic Shrinkage Intensities
//!
//! Closed-form estimators for the three independent shrinkage intensities
//! used by SDA. Each is a plug-in estimate of the loss-minimizing interpolation
//! weight between an unbiased empirical estimate and a fixed target, built
//! from bias-corrected empirical moments; none of them searches or
//! cross-validates.
//!
//! | intensity   | target          | estimator                |
//! |-------------|-----------------|--------------------------|
//! | frequency   | uniform `1/K`   | James-Stein              |
//! | variance    | median variance | Opgen-Rhein and Strimmer |
//! | correlation | identity        | Schäfer and Strimmer     |

use super::ShrinkageError;
use super::moments::{SampleWeights, median, standardize};
use super::svd::positive_svd;
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Whether a shrinkage intensity is estimated from data or supplied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    #[default]
    Auto,
    /// A user-supplied value, clamped into `[0, 1]` when resolved.
    Fixed(f64),
}

/// A resolved intensity together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShrinkageIntensity {
    pub value: f64,
    pub estimated: bool,
}

impl ShrinkageIntensity {
    pub fn estimated(value: f64) -> Self {
        Self {
            value: clamp_unit(value),
            estimated: true,
        }
    }

    pub fn specified(value: f64) -> Self {
        Self {
            value: clamp_unit(value),
            estimated: false,
        }
    }
}

impl Intensity {
    /// Resolves to a concrete intensity, running `estimate` only for `Auto`.
    pub fn resolve<F>(self, estimate: F) -> Result<ShrinkageIntensity, ShrinkageError>
    where
        F: FnOnce() -> Result<f64, ShrinkageError>,
    {
        match self {
            Intensity::Auto => Ok(ShrinkageIntensity::estimated(estimate()?)),
            Intensity::Fixed(value) => Ok(ShrinkageIntensity::specified(value)),
        }
    }
}

/// Restricts `x` to `[0, 1]`. NaN maps to 1, i.e. full shrinkage.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 1.0 } else { x.clamp(0.0, 1.0) }
}

fn require_samples(context: &'static str, n: usize) -> Result<(), ShrinkageError> {
    if n < 3 {
        return Err(ShrinkageError::InsufficientSamples {
            context,
            required: 3,
            found: n,
        });
    }
    Ok(())
}

/// James-Stein intensity for class frequencies, shrinking toward the uniform
/// distribution.
///
/// Uses the unbiased variance `u_k (1 - u_k) / (n - 1)` of the empirical
/// proportions. With fewer than two samples the estimate is degenerate and
/// full shrinkage (1) is returned regardless of the counts.
pub fn estimate_lambda_freq(counts: &[usize]) -> f64 {
    let n: usize = counts.iter().sum();
    if n <= 1 || counts.is_empty() {
        return 1.0;
    }
    let n = n as f64;
    let target = 1.0 / counts.len() as f64;

    let mut variance_sum = 0.0;
    let mut misspecification = 0.0;
    for &count in counts {
        let u = count as f64 / n;
        variance_sum += u * (1.0 - u) / (n - 1.0);
        misspecification += (u - target).powi(2);
    }

    if misspecification == 0.0 {
        1.0
    } else {
        clamp_unit(variance_sum / misspecification)
    }
}

/// Shrinks the empirical class frequencies of `counts` toward `1/K`.
pub fn shrink_frequencies(
    counts: &[usize],
    lambda: Intensity,
) -> Result<(Array1<f64>, ShrinkageIntensity), ShrinkageError> {
    let lambda = lambda.resolve(|| Ok(estimate_lambda_freq(counts)))?;
    if counts.is_empty() {
        return Ok((Array1::zeros(0), lambda));
    }

    let n: usize = counts.iter().sum();
    let target = 1.0 / counts.len() as f64;
    let freqs = counts
        .iter()
        .map(|&count| {
            let u = if n == 0 { 0.0 } else { count as f64 / n as f64 };
            lambda.value * target + (1.0 - lambda.value) * u
        })
        .collect();
    Ok((freqs, lambda))
}

/// Intensity for shrinking the vector of variances toward its median.
///
/// Requires at least three samples.
pub fn estimate_lambda_var(
    x: ArrayView2<f64>,
    weights: Option<&SampleWeights>,
) -> Result<f64, ShrinkageError> {
    let n = x.nrows();
    require_samples("variance shrinkage intensity estimation", n)?;
    let w = SampleWeights::resolve(weights, n)?;
    let h1 = w.h1();
    let h1w2 = w.h1w2();

    let xc = standardize(x, &w, true, false)?.data;
    let wcol = w.view().insert_axis(Axis(1));
    let zz = xc.mapv(|v| v * v);

    let q1 = (&zz * &wcol).sum_axis(Axis(0));
    let variances = &q1 * h1;
    let target = median(variances.view());

    let fourth = (&zz.mapv(|z| z * z) * &wcol).sum_axis(Axis(0));
    let q2 = &fourth - &q1.mapv(|q| q * q);

    let numerator = q2.sum();
    let denominator: f64 = q1.iter().map(|&q| (q - target / h1).powi(2)).sum();

    let lambda = if denominator == 0.0 {
        1.0
    } else {
        clamp_unit(numerator / denominator * h1w2)
    };
    log::debug!("Estimated variance shrinkage intensity: {lambda:.6}");
    Ok(lambda)
}

/// Intensity for shrinking the correlation matrix toward the identity.
///
/// The two off-diagonal sums the estimator needs are computed without
/// forming any `p x p` matrix: the sum of squared empirical correlations
/// from the cubed singular values of the weighted standardized data, and the
/// sum of cross fourth moments with a running sum over the features in
/// reverse order. A single feature has nothing to shrink and yields 1.
pub fn estimate_lambda_cor(
    x: ArrayView2<f64>,
    weights: Option<&SampleWeights>,
) -> Result<f64, ShrinkageError> {
    let (n, p) = x.dim();
    if p <= 1 {
        return Ok(1.0);
    }
    require_samples("correlation shrinkage intensity estimation", n)?;
    let w = SampleWeights::resolve(weights, n)?;
    let h1w2 = w.h1w2();

    let xs = standardize(x, &w, true, true)?.data;
    let sw = w.view().mapv(f64::sqrt).insert_axis(Axis(1));
    let xsw = &xs * &sw;

    let svd = positive_svd(xsw.view(), None)?;
    let u_d3 = &svd.u * &svd.d.mapv(|d| d.powi(3));
    let all_pairs = (&xsw * &u_d3.dot(&svd.v.t())).sum();
    let diagonal: f64 = xsw
        .mapv(|v| v * v)
        .sum_axis(Axis(0))
        .iter()
        .map(|&s| s * s)
        .sum();
    let sum_e2r = all_pairs - diagonal;

    let xs2w = &xs.mapv(|v| v * v) * &sw;
    let mut sum_er2 = 0.0;
    for row in xs2w.rows() {
        let mut suffix = 0.0;
        for &a in row.iter().rev() {
            sum_er2 += a * suffix;
            suffix += a;
        }
    }
    sum_er2 *= 2.0;

    let lambda = if sum_e2r == 0.0 {
        1.0
    } else {
        clamp_unit((sum_er2 - sum_e2r) / sum_e2r * h1w2)
    };
    log::debug!("Estimated correlation shrinkage intensity: {lambda:.6}");
    Ok(lambda)
}
