//! Correlation adjustment shared by CAT scores and training.
//!
//! This is the only place where a failed decomposition is not an error: the
//! adjustment is skipped, the features are treated as uncorrelated and the
//! caller is told so through `was_diagonal`.

use crate::SdaError;
use crate::shrink::{
    CorrelationProjection, Intensity, ShrinkageError, ShrinkageIntensity, crossprod_powcor_shrink,
};
use ndarray::{Array2, ArrayView2};

/// Columns of `y` after the correlation adjustment.
#[derive(Debug, Clone)]
pub struct Adjusted {
    pub matrix: Array2<f64>,
    /// Reported as fully shrunk (1) whenever the adjustment was skipped.
    pub lambda_cor: ShrinkageIntensity,
    pub was_diagonal: bool,
}

impl Adjusted {
    fn diagonal(y: Array2<f64>) -> Self {
        Self {
            matrix: y,
            lambda_cor: ShrinkageIntensity::specified(1.0),
            was_diagonal: true,
        }
    }
}

/// Applies `R_shrink^alpha` of the class-centered data `xc` to every column of
/// `y`, unless `diagonal` is set.
pub fn adjust_for_correlation(
    xc: ArrayView2<f64>,
    y: Array2<f64>,
    alpha: f64,
    lambda_cor: Intensity,
    diagonal: bool,
    level: log::Level,
) -> Result<Adjusted, SdaError> {
    if diagonal {
        log::log!(level, "Diagonal mode: skipping the correlation adjustment");
        return Ok(Adjusted::diagonal(y));
    }

    log::log!(
        level,
        "Computing the shrinkage correlation matrix product (alpha = {alpha})"
    );
    let projection = crossprod_powcor_shrink(xc, y.view(), alpha, lambda_cor, None);
    settle_projection(projection, y, level)
}

/// Turns the projector's outcome into an [`Adjusted`] matrix. A failed
/// decomposition gives back `y` unchanged in diagonal mode; any other error
/// propagates.
fn settle_projection(
    projection: Result<CorrelationProjection, ShrinkageError>,
    y: Array2<f64>,
    level: log::Level,
) -> Result<Adjusted, SdaError> {
    match projection {
        Ok(projection) => {
            crate::groups::log_intensity(level, "the correlation matrix", &projection.lambda);
            Ok(Adjusted {
                matrix: projection.projected,
                lambda_cor: projection.lambda,
                was_diagonal: false,
            })
        }
        Err(err) if err.is_decomposition_failure() => {
            log::warn!("Correlation adjustment failed ({err}); falling back to a diagonal model");
            Ok(Adjusted::diagonal(y))
        }
        Err(err) => Err(err.into()),
    }
}
