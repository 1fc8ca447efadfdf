use crate::SdaError;
use crate::adjust::adjust_for_correlation;
use crate::config::SdaConfig;
use crate::groups::{GroupOptions, summarize};
use crate::model::{Regularization, SdaModel};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Trains a shrinkage discriminant analysis model on `x` (`n x p`) with one
/// label per row.
///
/// The coefficients of class `k` are `D^-1 R_shrink^-1 D^-1 (mu_k - mu_pooled)`
/// with `D` the pooled shrinkage standard deviations, and the intercept is
/// `ln(freq_k) - beta_k . (mu_k + mu_pooled) / 2`. If the correlation matrix
/// cannot be decomposed the model is trained in diagonal mode and flagged.
pub fn train<L: Clone + Ord>(
    x: ArrayView2<f64>,
    labels: &[L],
    config: &SdaConfig,
) -> Result<SdaModel<L>, SdaError> {
    let (summary, centered) = summarize(x, labels, &GroupOptions::pooled(config))?;
    let sd = summary.pooled_variance().mapv(f64::sqrt);
    let inverse_sd = sd.mapv(|s| if s == 0.0 { 0.0 } else { 1.0 / s });
    let pooled_mean = summary.pooled_mean();
    let class_means = summary.class_means();

    let diff = &class_means - &pooled_mean.insert_axis(Axis(1));
    let scaled = &diff * &inverse_sd.view().insert_axis(Axis(1));

    let adjusted = adjust_for_correlation(
        centered.view(),
        scaled,
        -1.0,
        config.shrinkage.lambda_cor,
        config.diagonal,
        config.progress_level(),
    )?;
    // p x K
    let beta = &adjusted.matrix * &inverse_sd.insert_axis(Axis(1));

    let midpoints = (&class_means + &pooled_mean.insert_axis(Axis(1))) * 0.5;
    let intercept: Array1<f64> = summary
        .freqs
        .iter()
        .enumerate()
        .map(|(k, &f)| f.ln() - beta.column(k).dot(&midpoints.column(k)))
        .collect();
    let coefficients: Array2<f64> = beta.t().to_owned();

    log::log!(
        config.progress_level(),
        "Trained {} classes on {} features{}",
        summary.num_classes(),
        summary.num_features(),
        if adjusted.was_diagonal { " (diagonal)" } else { "" }
    );

    Ok(SdaModel {
        regularization: Regularization {
            lambda_cor: adjusted.lambda_cor,
            lambda_var: summary.pooled_var_lambda(),
            lambda_freqs: summary.freqs_lambda,
        },
        was_diagonal: adjusted.was_diagonal,
        labels: summary.labels,
        freqs: summary.freqs,
        intercept,
        coefficients,
    })
}
