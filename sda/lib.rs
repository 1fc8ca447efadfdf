#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

//! Shrinkage discriminant analysis.
//!
//! A linear discriminant classifier with a shared, shrinkage-regularized
//! covariance, intended for data with far more features than samples. The
//! numerical engine lives in [`shrink`]; this crate root wires it into group
//! statistics, CAT-score feature ranking, training and prediction.

#[path = "../shrink/mod.rs"]
pub mod shrink;

pub mod adjust;
pub mod catscore;
pub mod config;
pub mod groups;
pub mod model;
pub mod predict;
pub mod ranking;
pub mod train;

pub use catscore::{CatScores, catscore};
pub use config::{ConfigError, RankingScore, SdaConfig, ShrinkageConfig};
pub use groups::{GroupOptions, GroupSummary, VarianceIntensity, group_statistics};
pub use model::{ModelError, Regularization, SdaModel};
pub use predict::Prediction;
pub use ranking::{RankingResult, rank_cat_scores, rank_features, summarize_cat_scores};
pub use shrink::{Intensity, ShrinkageError, ShrinkageIntensity};
pub use train::train;

use thiserror::Error;

/// Errors raised by the classifier layer.
#[derive(Error, Debug)]
pub enum SdaError {
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}.")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(
        "Invalid variance shrinkage specification: expected a single value or {expected} values (one per class plus one for the pooled variance), but {found} were given."
    )]
    InvalidShrinkageSpec { expected: usize, found: usize },

    #[error("{context} requires at least {required} samples, but only {found} were provided.")]
    InsufficientSamples {
        context: &'static str,
        required: usize,
        found: usize,
    },

    #[error("Discriminant analysis requires at least two classes, but the labels contain {found}.")]
    TooFewClasses { found: usize },

    #[error(transparent)]
    Shrinkage(#[from] ShrinkageError),
}
