//! # Group Statistics
//!
//! Partitions a dataset by class label and computes everything the classifier
//! needs from that partition: class sizes, class and pooled means, shrunk
//! class frequencies and shrunk (pooled and optionally per-class) variances.
//!
//! Classes are ordered by sorting the distinct labels, so the column order of
//! every per-class result is independent of the order of the samples.

use crate::SdaError;
use crate::config::SdaConfig;
use crate::shrink::{Intensity, ShrinkageIntensity, shrink_frequencies, var_shrink};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use std::collections::BTreeMap;

/// Variance shrinkage intensities for group statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum VarianceIntensity {
    /// Estimate each intensity from the data.
    #[default]
    Auto,
    /// One value for every variance estimate.
    Fixed(f64),
    /// With per-class variances: either one value, or one per class followed
    /// by one for the pooled variance. Without them: exactly one value.
    PerGroup(Vec<f64>),
}

impl From<Intensity> for VarianceIntensity {
    fn from(intensity: Intensity) -> Self {
        match intensity {
            Intensity::Auto => VarianceIntensity::Auto,
            Intensity::Fixed(value) => VarianceIntensity::Fixed(value),
        }
    }
}

impl VarianceIntensity {
    /// One intensity per variance estimate: `num_classes + 1` when per-class
    /// variances are requested, otherwise one for the pooled variance.
    fn resolve(&self, num_classes: usize, var_groups: bool) -> Result<Vec<Intensity>, SdaError> {
        let slots = if var_groups { num_classes + 1 } else { 1 };
        match self {
            VarianceIntensity::Auto => Ok(vec![Intensity::Auto; slots]),
            VarianceIntensity::Fixed(value) => Ok(vec![Intensity::Fixed(*value); slots]),
            VarianceIntensity::PerGroup(values) => match values.as_slice() {
                [single] => Ok(vec![Intensity::Fixed(*single); slots]),
                many if many.len() == slots => {
                    Ok(many.iter().map(|&v| Intensity::Fixed(v)).collect())
                }
                other => Err(SdaError::InvalidShrinkageSpec {
                    expected: slots,
                    found: other.len(),
                }),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    pub lambda_var: VarianceIntensity,
    pub lambda_freqs: Intensity,
    /// Also estimate one shrunk variance vector per class.
    pub var_groups: bool,
    /// Keep the class-centered data in the summary.
    pub centered_data: bool,
    pub verbose: bool,
}

impl GroupOptions {
    /// Pooled-variance options derived from a classifier configuration.
    pub fn pooled(config: &SdaConfig) -> Self {
        Self {
            lambda_var: config.shrinkage.lambda_var.into(),
            lambda_freqs: config.shrinkage.lambda_freqs,
            var_groups: false,
            centered_data: true,
            verbose: config.verbose,
        }
    }

    fn progress_level(&self) -> log::Level {
        crate::config::progress_level(self.verbose)
    }
}

/// Result of [`group_statistics`].
#[derive(Debug, Clone)]
pub struct GroupSummary<L> {
    /// Distinct labels in sorted order; defines the class order.
    pub labels: Vec<L>,
    /// Number of samples per class.
    pub samples: Vec<usize>,
    /// `p x (K + 1)`: one column per class, then the pooled mean.
    pub means: Array2<f64>,
    /// `p x (K + 1)` with per-class variances (pooled last), otherwise `p x 1`.
    pub variances: Array2<f64>,
    /// Intensity used for each column of `variances`.
    pub var_lambdas: Vec<ShrinkageIntensity>,
    /// Shrunk class frequencies, summing to one.
    pub freqs: Array1<f64>,
    pub freqs_lambda: ShrinkageIntensity,
    /// `n x p` data with each sample's class mean subtracted, when requested.
    pub centered_data: Option<Array2<f64>>,
}

impl<L> GroupSummary<L> {
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.means.nrows()
    }

    /// `p x K` class means.
    pub fn class_means(&self) -> ArrayView2<'_, f64> {
        self.means.slice(s![.., ..self.num_classes()])
    }

    pub fn pooled_mean(&self) -> ArrayView1<'_, f64> {
        self.means.column(self.num_classes())
    }

    /// The pooled variance is always the last column of `variances`.
    pub fn pooled_variance(&self) -> ArrayView1<'_, f64> {
        self.variances.column(self.variances.ncols() - 1)
    }

    pub fn pooled_var_lambda(&self) -> ShrinkageIntensity {
        self.var_lambdas[self.var_lambdas.len() - 1]
    }
}

/// Class means, frequencies and shrunk variances of `x` (`n x p`) grouped by
/// `labels` (length `n`).
pub fn group_statistics<L: Clone + Ord>(
    x: ArrayView2<f64>,
    labels: &[L],
    options: &GroupOptions,
) -> Result<GroupSummary<L>, SdaError> {
    let (mut summary, centered) = summarize(x, labels, options)?;
    if options.centered_data {
        summary.centered_data = Some(centered);
    }
    Ok(summary)
}

/// [`group_statistics`] that always hands back the class-centered data,
/// leaving `centered_data` in the summary empty.
pub(crate) fn summarize<L: Clone + Ord>(
    x: ArrayView2<f64>,
    labels: &[L],
    options: &GroupOptions,
) -> Result<(GroupSummary<L>, Array2<f64>), SdaError> {
    let (n, p) = x.dim();
    if labels.len() != n {
        return Err(SdaError::DimensionMismatch {
            context: "class labels vs. rows of the data matrix",
            expected: n,
            found: labels.len(),
        });
    }

    let mut members: BTreeMap<&L, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        members.entry(label).or_default().push(i);
    }
    let num_classes = members.len();
    if num_classes < 2 {
        return Err(SdaError::TooFewClasses { found: num_classes });
    }
    if n <= num_classes {
        return Err(SdaError::InsufficientSamples {
            context: "Pooled variance estimation",
            required: num_classes + 1,
            found: n,
        });
    }
    let intensities = options.lambda_var.resolve(num_classes, options.var_groups)?;

    let level = options.progress_level();
    log::log!(level, "Number of features: {p}");
    log::log!(level, "Number of samples: {n}");
    log::log!(level, "Number of classes: {num_classes}");

    let class_labels: Vec<L> = members.keys().map(|&label| label.clone()).collect();
    let groups: Vec<Vec<usize>> = members.into_values().collect();
    let samples: Vec<usize> = groups.iter().map(Vec::len).collect();

    let (freqs, freqs_lambda) = shrink_frequencies(&samples, options.lambda_freqs)?;
    log_intensity(level, "class frequencies", &freqs_lambda);

    let mut means = Array2::<f64>::zeros((p, num_classes + 1));
    let mut centered = Array2::<f64>::zeros((n, p));
    let variance_columns = intensities.len();
    let mut variances = Array2::<f64>::zeros((p, variance_columns));
    let mut var_lambdas = Vec::with_capacity(variance_columns);

    for (k, rows) in groups.iter().enumerate() {
        let xk = x.select(Axis(0), rows);
        let mean = xk.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        for (&i, row) in rows.iter().zip(xk.rows()) {
            centered.row_mut(i).assign(&(&row - &mean));
        }

        if options.var_groups {
            log::log!(level, "Estimating variances (class #{})", k + 1);
            let shrunk = var_shrink(xk.view(), intensities[k], None)?;
            log_intensity(level, "class variances", &shrunk.lambda);
            variances.column_mut(k).assign(&shrunk.variances);
            var_lambdas.push(shrunk.lambda);
        }
        means.column_mut(k).assign(&mean);
    }

    let pooled_mean = means.slice(s![.., ..num_classes]).dot(&freqs);
    means.column_mut(num_classes).assign(&pooled_mean);

    log::log!(level, "Estimating variances (pooled across classes)");
    let pooled = var_shrink(centered.view(), intensities[variance_columns - 1], None)?;
    log_intensity(level, "pooled variances", &pooled.lambda);
    let correction = (n - 1) as f64 / (n - num_classes) as f64;
    variances
        .column_mut(variance_columns - 1)
        .assign(&(pooled.variances * correction));
    var_lambdas.push(pooled.lambda);

    let summary = GroupSummary {
        labels: class_labels,
        samples,
        means,
        variances,
        var_lambdas,
        freqs,
        freqs_lambda,
        centered_data: None,
    };
    Ok((summary, centered))
}

pub(crate) fn log_intensity(level: log::Level, what: &str, lambda: &ShrinkageIntensity) {
    let how = if lambda.estimated { "Estimated" } else { "Specified" };
    log::log!(level, "{how} shrinkage intensity for {what}: {:.4}", lambda.value);
}
