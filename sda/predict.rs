use crate::SdaError;
use crate::model::SdaModel;
use ndarray::{Array2, ArrayView2, Axis};

/// Predicted labels and class posteriors for a batch of samples.
#[derive(Debug, Clone)]
pub struct Prediction<L> {
    pub predicted: Vec<L>,
    /// `n x K`; each row sums to one.
    pub posterior: Array2<f64>,
}

impl<L: Clone> SdaModel<L> {
    /// Classifies every row of `x`.
    ///
    /// The predicted label is the class with the largest posterior; ties go to
    /// the class that comes first in `labels`. Scores that overflow to
    /// infinity still give rows summing to one; NaN inputs give NaN rows.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Prediction<L>, SdaError> {
        if x.ncols() != self.num_features() {
            return Err(SdaError::DimensionMismatch {
                context: "features of the test data vs. the trained model",
                expected: self.num_features(),
                found: x.ncols(),
            });
        }

        let classes = self.num_classes();
        for (context, found) in [
            ("intercept vs. class labels of the model", self.intercept.len()),
            ("coefficient rows vs. class labels of the model", self.coefficients.nrows()),
        ] {
            if found != classes {
                return Err(SdaError::DimensionMismatch {
                    context,
                    expected: classes,
                    found,
                });
            }
        }

        let mut posterior = x.dot(&self.coefficients.t()) + &self.intercept;
        for mut row in posterior.axis_iter_mut(Axis(0)) {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max == f64::INFINITY {
                // Overflowed scores share all the mass.
                row.mapv_inplace(|s| if s == f64::INFINITY { 1.0 } else { 0.0 });
            } else if max == f64::NEG_INFINITY {
                row.fill(1.0);
            } else {
                row.mapv_inplace(|s| (s - max).exp());
            }
            let total = row.sum();
            row /= total;
        }

        let predicted = posterior
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = k;
                    }
                }
                self.labels[best].clone()
            })
            .collect();

        Ok(Prediction {
            predicted,
            posterior,
        })
    }
}
