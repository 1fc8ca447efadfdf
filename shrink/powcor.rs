//! # Correlation Power Projector
//!
//! Computes `R_shrink^alpha * Y` for the shrinkage correlation matrix
//!
//! ```text
//! R_shrink = (1 - lambda) * R + lambda * I
//! ```
//!
//! of a data matrix `X` (`n x p`) without forming any `p x p` matrix. With the
//! positive SVD `Xs = U D V'` of the standardized data, the empirical
//! correlation is `R = V C V' / (1 - lambda)` where
//! `C = (1 - lambda) * h1 * (U'WU) o (d d')` is only `rank x rank`. Powers of
//! `R_shrink` then reduce to powers of `C`:
//!
//! - `lambda = 0`: `R^alpha * Y = V C^alpha V' Y`.
//! - `lambda > 0`: `R_shrink^alpha * Y = (Y - V F V' Y) * lambda^alpha` with
//!   `F = I - (C / lambda + I)^alpha`.
//!
//! The second form never raises a small eigenvalue of `C` to a negative power,
//! which is what keeps the inverse well conditioned for small `lambda`.

use super::ShrinkageError;
use super::intensity::{Intensity, ShrinkageIntensity, estimate_lambda_cor};
use super::moments::{SampleWeights, standardize};
use super::svd::positive_svd;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_linalg::{Eigh, UPLO};

/// Result of [`crossprod_powcor_shrink`].
#[derive(Debug, Clone)]
pub struct CorrelationProjection {
    /// `R_shrink^alpha * Y`, same shape as `Y`.
    pub projected: Array2<f64>,
    pub lambda: ShrinkageIntensity,
}

/// Projects every column of `y` (`p x m`) onto `R_shrink^alpha`, where
/// `R_shrink` is the shrinkage correlation matrix of `x` (`n x p`).
///
/// Rows of the result that belong to zero-variance features of `x` are copied
/// from `y` unchanged. Decomposition failures are returned to the caller.
pub fn crossprod_powcor_shrink(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    alpha: f64,
    lambda_cor: Intensity,
    weights: Option<&SampleWeights>,
) -> Result<CorrelationProjection, ShrinkageError> {
    let (n, p) = x.dim();
    if y.nrows() != p {
        return Err(ShrinkageError::DimensionMismatch {
            context: "rows of the projected matrix vs. features of the data",
            expected: p,
            found: y.nrows(),
        });
    }
    let w = SampleWeights::resolve(weights, n)?;
    let lambda = lambda_cor.resolve(|| estimate_lambda_cor(x, Some(&w)))?;

    // R_shrink is the identity.
    if lambda.value == 1.0 || alpha == 0.0 {
        return Ok(CorrelationProjection {
            projected: y.to_owned(),
            lambda,
        });
    }

    let standardized = standardize(x, &w, true, true)?;
    let zero_variance = standardized.zero_variance_mask();
    let svd = positive_svd(standardized.data.view(), None)?;
    log::debug!(
        "Correlation projection: n={n}, p={p}, rank={}, alpha={alpha}, lambda={:.6}",
        svd.rank(),
        lambda.value
    );

    let wcol = w.view().insert_axis(Axis(1));
    let utwu = svd.u.t().dot(&(&svd.u * &wcol));
    let scale = (1.0 - lambda.value) * w.h1();
    let d = &svd.d;
    let c = Array2::from_shape_fn(utwu.dim(), |(i, j)| scale * utwu[[i, j]] * d[i] * d[j]);
    let c = (&c + &c.t()) * 0.5;

    let vty = svd.v.t().dot(&y);
    let mut projected = if lambda.value == 0.0 {
        let c_pow = symmetric_power(&c, alpha)?;
        svd.v.dot(&c_pow.dot(&vty))
    } else {
        let rank = svd.rank();
        let eye = Array2::<f64>::eye(rank);
        let f = &eye - &symmetric_power(&(&c / lambda.value + &eye), alpha)?;
        (&y - &svd.v.dot(&f.dot(&vty))) * lambda.value.powf(alpha)
    };

    for (j, &is_zero) in zero_variance.iter().enumerate() {
        if is_zero {
            projected.row_mut(j).assign(&y.row(j));
        }
    }

    Ok(CorrelationProjection { projected, lambda })
}

/// `m^alpha` for a symmetric positive semidefinite matrix via its
/// eigendecomposition. Non-positive eigenvalues contribute zero, so negative
/// powers act as pseudo-inverses on rank-deficient input.
fn symmetric_power(m: &Array2<f64>, alpha: f64) -> Result<Array2<f64>, ShrinkageError> {
    if m.is_empty() {
        return Ok(m.clone());
    }
    let (values, vectors) = m.eigh(UPLO::Lower)?;
    let powered: Array1<f64> = values.mapv(|v| if v > 0.0 { v.powf(alpha) } else { 0.0 });
    Ok((&vectors * &powered).dot(&vectors.t()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, StandardNormal};

    fn random_matrix(n: usize, p: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((n, p), |_| StandardNormal.sample(&mut rng))
    }

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        (a - b).iter().fold(0.0, |acc, &v| acc.max(v.abs()))
    }

    /// Forms `R_shrink` explicitly and raises it to `alpha`.
    fn explicit_projection(
        x: &Array2<f64>,
        y: &Array2<f64>,
        alpha: f64,
        lambda: f64,
        w: &SampleWeights,
    ) -> Array2<f64> {
        let xs = standardize(x.view(), w, true, true).unwrap().data;
        let wcol = w.view().insert_axis(Axis(1));
        let r = xs.t().dot(&(&xs * &wcol)) * w.h1();
        let p = r.nrows();
        let shrunk = &r * (1.0 - lambda) + &(Array2::<f64>::eye(p) * lambda);
        symmetric_power(&shrunk, alpha).unwrap().dot(y)
    }

    #[test]
    fn identity_shortcut_is_exact() {
        let x = random_matrix(8, 20, 1);
        let y = random_matrix(20, 3, 2);

        let full = crossprod_powcor_shrink(x.view(), y.view(), -1.0, Intensity::Fixed(1.0), None)
            .unwrap();
        assert_eq!(full.projected, y);

        let zero_power =
            crossprod_powcor_shrink(x.view(), y.view(), 0.0, Intensity::Fixed(0.4), None).unwrap();
        assert_eq!(zero_power.projected, y);
        assert_eq!(zero_power.lambda, ShrinkageIntensity::specified(0.4));
    }

    #[test]
    fn matches_explicit_matrix_power() {
        for &(n, p, seed) in &[(15, 6, 3), (6, 15, 4), (10, 9, 5)] {
            let x = random_matrix(n, p, seed);
            let y = random_matrix(p, 2, seed + 100);
            let w = SampleWeights::uniform(n);
            for &(alpha, lambda) in &[(-1.0, 0.3), (-0.5, 0.05), (0.5, 0.7), (2.0, 0.0)] {
                let fast =
                    crossprod_powcor_shrink(x.view(), y.view(), alpha, Intensity::Fixed(lambda), None)
                        .unwrap();
                let slow = explicit_projection(&x, &y, alpha, lambda, &w);
                let err = max_abs_diff(&fast.projected, &slow);
                assert!(
                    err < 1e-8,
                    "shape ({n}, {p}), alpha {alpha}, lambda {lambda}: error {err}"
                );
            }
        }
    }

    #[test]
    fn weighted_projection_matches_explicit_matrix_power() {
        let x = random_matrix(9, 12, 21);
        let y = random_matrix(12, 1, 22);
        let w = SampleWeights::new(Array1::linspace(1.0, 2.0, 9), 9).unwrap();
        let fast =
            crossprod_powcor_shrink(x.view(), y.view(), -0.5, Intensity::Fixed(0.2), Some(&w))
                .unwrap();
        let slow = explicit_projection(&x, &y, -0.5, 0.2, &w);
        assert!(max_abs_diff(&fast.projected, &slow) < 1e-8);
    }

    #[test]
    fn powers_compose() {
        let x = random_matrix(7, 25, 8);
        let y = random_matrix(25, 2, 9);
        let lambda = Intensity::Fixed(0.25);

        let half = crossprod_powcor_shrink(x.view(), y.view(), -0.5, lambda, None).unwrap();
        let twice =
            crossprod_powcor_shrink(x.view(), half.projected.view(), -0.5, lambda, None).unwrap();
        let once = crossprod_powcor_shrink(x.view(), y.view(), -1.0, lambda, None).unwrap();
        assert!(max_abs_diff(&twice.projected, &once.projected) < 1e-8);

        let back = crossprod_powcor_shrink(x.view(), once.projected.view(), 1.0, lambda, None)
            .unwrap();
        assert!(max_abs_diff(&back.projected, &y) < 1e-8);
    }

    #[test]
    fn zero_variance_features_pass_through() {
        let mut x = random_matrix(10, 5, 31);
        x.column_mut(2).fill(7.0);
        let y = random_matrix(5, 2, 32);

        let result =
            crossprod_powcor_shrink(x.view(), y.view(), -1.0, Intensity::Fixed(0.3), None).unwrap();
        assert_eq!(result.projected.row(2), y.row(2));

        // The constant feature is uncorrelated with the rest, so the other rows
        // equal the projection computed without it.
        let keep = [0, 1, 3, 4];
        let x_rest = x.select(Axis(1), &keep);
        let y_rest = y.select(Axis(0), &keep);
        let rest =
            crossprod_powcor_shrink(x_rest.view(), y_rest.view(), -1.0, Intensity::Fixed(0.3), None)
                .unwrap();
        let ours = result.projected.select(Axis(0), &keep);
        assert!(max_abs_diff(&ours, &rest.projected) < 1e-10);
    }

    #[test]
    fn all_constant_data_returns_input() {
        let x = Array2::from_elem((5, 3), 1.5);
        let y = array![[1.0], [2.0], [3.0]];
        let result =
            crossprod_powcor_shrink(x.view(), y.view(), -1.0, Intensity::Fixed(0.5), None).unwrap();
        assert_eq!(result.projected, y);
    }

    #[test]
    fn estimated_intensity_is_reported() {
        let x = random_matrix(12, 30, 41);
        let y = random_matrix(30, 1, 42);
        let result = crossprod_powcor_shrink(x.view(), y.view(), -1.0, Intensity::Auto, None).unwrap();
        assert!(result.lambda.estimated);
        let expected = estimate_lambda_cor(x.view(), None).unwrap();
        assert_eq!(result.lambda.value, expected);
    }

    #[test]
    fn flattened_input_is_rejected() {
        let x = random_matrix(6, 4, 51);
        let y = random_matrix(4, 1, 52);
        // A single row of length 4 instead of a 4 x 1 column.
        let flat = y.slice(s![.., 0]).insert_axis(Axis(0)).to_owned();
        match crossprod_powcor_shrink(x.view(), flat.view(), -1.0, Intensity::Fixed(0.5), None) {
            Err(ShrinkageError::DimensionMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(found, 1);
            }
            other => panic!("Expected DimensionMismatch, got {other:?}"),
        }
    }
}
