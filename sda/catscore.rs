//! # CAT Scores
//!
//! Correlation-adjusted t-scores compare each class mean with the pooled mean,
//! feature by feature, and then decorrelate the resulting t-scores with
//! `R_shrink^(-1/2)`. In diagonal mode they reduce to plain shrinkage
//! t-scores.

use crate::SdaError;
use crate::adjust::adjust_for_correlation;
use crate::config::SdaConfig;
use crate::groups::{GroupOptions, summarize};
use crate::model::Regularization;
use ndarray::{Array1, Array2, ArrayView2};

/// CAT scores of every feature for every class.
#[derive(Debug, Clone)]
pub struct CatScores<L> {
    /// `p x K`, columns in the order of `labels`.
    pub cat: Array2<f64>,
    pub labels: Vec<L>,
    pub freqs: Array1<f64>,
    pub regularization: Regularization,
    pub was_diagonal: bool,
}

/// Computes CAT scores (or t-scores when `config.diagonal` is set) for the
/// classes in `labels`.
pub fn catscore<L: Clone + Ord>(
    x: ArrayView2<f64>,
    labels: &[L],
    config: &SdaConfig,
) -> Result<CatScores<L>, SdaError> {
    let (summary, centered) = summarize(x, labels, &GroupOptions::pooled(config))?;
    let n = x.nrows() as f64;
    let sd = summary.pooled_variance().mapv(f64::sqrt);
    let pooled_mean = summary.pooled_mean();
    let class_means = summary.class_means();

    // Standard error of (class mean - pooled mean) in units of sd.
    let se = summary.freqs.mapv(|f| ((1.0 - f) / f / n).sqrt());

    let t = Array2::from_shape_fn(class_means.dim(), |(j, k)| {
        if sd[j] == 0.0 {
            0.0
        } else {
            (class_means[[j, k]] - pooled_mean[j]) / (se[k] * sd[j])
        }
    });

    let adjusted = adjust_for_correlation(
        centered.view(),
        t,
        -0.5,
        config.shrinkage.lambda_cor,
        config.diagonal,
        config.progress_level(),
    )?;

    Ok(CatScores {
        cat: adjusted.matrix,
        regularization: Regularization {
            lambda_cor: adjusted.lambda_cor,
            lambda_var: summary.pooled_var_lambda(),
            lambda_freqs: summary.freqs_lambda,
        },
        was_diagonal: adjusted.was_diagonal,
        labels: summary.labels,
        freqs: summary.freqs,
    })
}
