//! # Rank-Revealing SVD
//!
//! Returns only the numerically positive part of a singular value
//! decomposition. For strongly rectangular matrices the decomposition is
//! obtained from the eigendecomposition of the smaller Gram matrix, which
//! bounds the cost by `O(n * p * min(n, p))`; near-square matrices go through
//! LAPACK's SVD directly. All three strategies describe the same subspace up
//! to the signs of the singular vectors.

use super::ShrinkageError;
use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use ndarray_linalg::{Eigh, SVD, UPLO};

/// Aspect ratio at which a Gram matrix becomes cheaper than a direct SVD.
const EDGE_RATIO: usize = 2;

/// The three equivalent ways of computing [`positive_svd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvdStrategy {
    /// Tall input (`p <= n/2`): eigendecompose the `p x p` matrix `M'M`.
    FeatureGram,
    /// Wide input (`n <= p/2`): eigendecompose the `n x n` matrix `MM'`.
    SampleGram,
    /// Near-square input: full SVD, truncated to the positive part.
    Direct,
}

impl SvdStrategy {
    /// Picks the strategy for an `n x p` matrix.
    pub fn for_shape(n: usize, p: usize) -> Self {
        if EDGE_RATIO * p <= n {
            SvdStrategy::FeatureGram
        } else if EDGE_RATIO * n <= p {
            SvdStrategy::SampleGram
        } else {
            SvdStrategy::Direct
        }
    }
}

/// The decomposition `M = U * diag(d) * V'` restricted to the numerical rank
/// of `M`. Singular values are sorted in decreasing order.
#[derive(Debug, Clone)]
pub struct PositiveSvd {
    pub d: Array1<f64>,
    /// `n x rank`
    pub u: Array2<f64>,
    /// `p x rank`
    pub v: Array2<f64>,
}

impl PositiveSvd {
    pub fn rank(&self) -> usize {
        self.d.len()
    }

    /// Rebuilds `U * diag(d) * V'`.
    pub fn reconstruct(&self) -> Array2<f64> {
        (&self.u * &self.d).dot(&self.v.t())
    }

    fn empty(n: usize, p: usize) -> Self {
        Self {
            d: Array1::zeros(0),
            u: Array2::zeros((n, 0)),
            v: Array2::zeros((p, 0)),
        }
    }
}

/// Positive-singular-value SVD with the strategy chosen from the shape of `m`.
///
/// `tol` is compared against singular values. When absent, the direct path
/// uses `max(n, p) * max(d) * eps` and the Gram paths use
/// `dim(G) * max(eigenvalue) * eps` on the eigenvalues of the Gram matrix `G`.
pub fn positive_svd(m: ArrayView2<f64>, tol: Option<f64>) -> Result<PositiveSvd, ShrinkageError> {
    positive_svd_with(SvdStrategy::for_shape(m.nrows(), m.ncols()), m, tol)
}

/// [`positive_svd`] with an explicit strategy.
pub fn positive_svd_with(
    strategy: SvdStrategy,
    m: ArrayView2<f64>,
    tol: Option<f64>,
) -> Result<PositiveSvd, ShrinkageError> {
    let (n, p) = m.dim();
    if n == 0 || p == 0 {
        return Ok(PositiveSvd::empty(n, p));
    }

    match strategy {
        SvdStrategy::FeatureGram => {
            let gram = m.t().dot(&m);
            let (d, v) = positive_gram_eigenpairs(&gram, tol)?;
            let u = m.dot(&v) / &d;
            Ok(PositiveSvd { d, u, v })
        }
        SvdStrategy::SampleGram => {
            let gram = m.dot(&m.t());
            let (d, u) = positive_gram_eigenpairs(&gram, tol)?;
            let v = m.t().dot(&u) / &d;
            Ok(PositiveSvd { d, u, v })
        }
        SvdStrategy::Direct => direct_positive_svd(m, tol),
    }
}

fn direct_positive_svd(m: ArrayView2<f64>, tol: Option<f64>) -> Result<PositiveSvd, ShrinkageError> {
    let (n, p) = m.dim();
    let (u, d, vt) = m.svd(true, true)?;
    let (Some(u), Some(vt)) = (u, vt) else {
        return Err(ShrinkageError::MissingSingularVectors);
    };

    let d_max = d.iter().copied().fold(0.0, f64::max);
    let tol = tol.unwrap_or(n.max(p) as f64 * d_max * f64::EPSILON);
    // LAPACK returns singular values in decreasing order.
    let rank = d.iter().take_while(|&&value| value > tol).count();

    Ok(PositiveSvd {
        d: d.slice(s![..rank]).to_owned(),
        u: u.slice(s![.., ..rank]).to_owned(),
        v: vt.slice(s![..rank, ..]).t().to_owned(),
    })
}

/// Square roots of the above-tolerance eigenvalues of a Gram matrix and the
/// matching eigenvectors, in decreasing order.
fn positive_gram_eigenpairs(
    gram: &Array2<f64>,
    tol: Option<f64>,
) -> Result<(Array1<f64>, Array2<f64>), ShrinkageError> {
    let (eigenvalues, eigenvectors) = gram.eigh(UPLO::Lower)?;

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    let largest = eigenvalues.iter().copied().fold(0.0, f64::max);
    let default_tol = gram.nrows() as f64 * largest * f64::EPSILON;
    let keep: Vec<usize> = order
        .into_iter()
        .filter(|&i| {
            let value = eigenvalues[i];
            match tol {
                Some(t) => value > 0.0 && value.sqrt() > t,
                None => value > default_tol,
            }
        })
        .collect();

    let d = keep.iter().map(|&i| eigenvalues[i].sqrt()).collect::<Array1<f64>>();
    Ok((d, eigenvectors.select(Axis(1), &keep)))
}
