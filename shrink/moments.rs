use super::ShrinkageError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Normalized, non-negative sample weights of length `n`.
///
/// All moment computations in the engine are weighted. The default is the
/// uniform weighting `1/n`, under which the bias corrections below reduce to
/// the familiar `n/(n-1)` and `1/(n-1)` factors.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWeights {
    weights: Array1<f64>,
}

impl SampleWeights {
    /// Uniform weights `1/n`.
    pub fn uniform(n: usize) -> Self {
        Self {
            weights: Array1::from_elem(n, 1.0 / n as f64),
        }
    }

    /// Wraps user-supplied weights for a dataset with `n` samples, rescaling
    /// them to sum to one when they do not already.
    ///
    /// Weights must be finite and non-negative with a positive total.
    pub fn new(weights: Array1<f64>, n: usize) -> Result<Self, ShrinkageError> {
        if weights.len() != n {
            return Err(ShrinkageError::DimensionMismatch {
                context: "sample weights",
                expected: n,
                found: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ShrinkageError::InvalidWeights {
                reason: "every weight must be finite",
            });
        }
        if weights.iter().any(|&w| w < 0.0) {
            return Err(ShrinkageError::InvalidWeights {
                reason: "weights must be non-negative",
            });
        }
        let total = weights.sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(ShrinkageError::InvalidWeights {
                reason: "weights must have a positive, finite total",
            });
        }
        let weights = if total == 1.0 {
            weights
        } else {
            weights / total
        };
        Ok(Self { weights })
    }

    /// Returns the caller's weights when given, otherwise uniform weights.
    /// Validates the length either way.
    pub fn resolve(weights: Option<&SampleWeights>, n: usize) -> Result<Self, ShrinkageError> {
        match weights {
            Some(w) if w.len() == n => Ok(w.clone()),
            Some(w) => Err(ShrinkageError::DimensionMismatch {
                context: "sample weights",
                expected: n,
                found: w.len(),
            }),
            None => Ok(Self::uniform(n)),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// `sum(w^2)`; equals `1/n` for uniform weights.
    pub fn sum_of_squares(&self) -> f64 {
        self.weights.dot(&self.weights)
    }

    /// Variance bias correction `1/(1 - sum(w^2))`.
    pub fn h1(&self) -> f64 {
        1.0 / (1.0 - self.sum_of_squares())
    }

    /// `sum(w^2)/(1 - sum(w^2))`; equals `1/(n-1)` for uniform weights.
    pub fn h1w2(&self) -> f64 {
        let w2 = self.sum_of_squares();
        w2 / (1.0 - w2)
    }
}

/// Weighted column means and bias-corrected column variances.
#[derive(Debug, Clone)]
pub struct WeightedMoments {
    pub mean: Array1<f64>,
    pub variance: Array1<f64>,
}

/// Computes `m = sum(w * x)` and `v = h1 * (sum(w * x^2) - m^2)` per column.
///
/// The variance is accumulated as `h1 * sum(w * (x - m)^2)`, which is the same
/// quantity for normalized weights but does not cancel catastrophically on
/// constant columns. Variances below machine epsilon are set to exactly zero so
/// that callers can detect constant features with an equality test.
pub fn weighted_moments(
    x: ArrayView2<f64>,
    weights: &SampleWeights,
) -> Result<WeightedMoments, ShrinkageError> {
    if weights.len() != x.nrows() {
        return Err(ShrinkageError::DimensionMismatch {
            context: "sample weights",
            expected: x.nrows(),
            found: weights.len(),
        });
    }

    let w = weights.view().insert_axis(Axis(1));
    let mean = (&x * &w).sum_axis(Axis(0));
    let centered = &x - &mean;
    let h1 = weights.h1();

    // A single sample has h1 = inf and a raw moment of exactly zero.
    let variance = (&centered.mapv(|v| v * v) * &w)
        .sum_axis(Axis(0))
        .mapv(|raw| {
            if raw <= 0.0 {
                return 0.0;
            }
            let v = h1 * raw;
            if v < f64::EPSILON { 0.0 } else { v }
        });

    Ok(WeightedMoments { mean, variance })
}

/// Output of [`standardize`].
#[derive(Debug, Clone)]
pub struct Standardized {
    /// The centered and/or scaled data; a fresh buffer, never the input.
    pub data: Array2<f64>,
    pub moments: WeightedMoments,
    /// Column standard deviations before scaling, present when scaling was
    /// requested. Zero entries mark zero-variance features.
    pub scale: Option<Array1<f64>>,
}

impl Standardized {
    /// `true` for every feature whose weighted variance is exactly zero.
    pub fn zero_variance_mask(&self) -> Array1<bool> {
        self.moments.variance.mapv(|v| v == 0.0)
    }
}

/// Optionally centers and/or scales the columns of `x` using weighted moments.
///
/// Zero-variance columns are treated as having an infinite scale, so after
/// scaling they become exactly zero instead of NaN or infinity.
pub fn standardize(
    x: ArrayView2<f64>,
    weights: &SampleWeights,
    center: bool,
    scale: bool,
) -> Result<Standardized, ShrinkageError> {
    let moments = weighted_moments(x, weights)?;
    let mut data = x.to_owned();

    if center {
        data -= &moments.mean;
    }

    let scale = if scale {
        let sd = moments.variance.mapv(f64::sqrt);
        let inverse = sd.mapv(|s| if s == 0.0 { 0.0 } else { 1.0 / s });
        data *= &inverse;
        Some(sd)
    } else {
        None
    };

    Ok(Standardized {
        data,
        moments,
        scale,
    })
}

/// Median of `values`, averaging the two middle values for an even count.
/// Returns 0 for an empty input.
pub fn median(values: ArrayView1<f64>) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}
