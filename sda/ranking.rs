//! Feature ranking by CAT scores.
//!
//! For two classes the three summaries coincide, since the two CAT scores of a
//! feature differ only in sign. They differ for three or more classes.

use crate::SdaError;
use crate::catscore::{CatScores, catscore};
use crate::config::{RankingScore, SdaConfig};
use crate::model::Regularization;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Features in decreasing order of importance.
#[derive(Debug, Clone)]
pub struct RankingResult<L> {
    /// Feature indices, most important first.
    pub order: Vec<usize>,
    /// Importance score of each feature in `order`.
    pub score: Array1<f64>,
    /// CAT scores with rows permuted to `order`.
    pub cat: Array2<f64>,
    pub labels: Vec<L>,
    pub freqs: Array1<f64>,
    pub regularization: Regularization,
    pub was_diagonal: bool,
}

/// One importance score per feature from a `p x K` CAT score matrix.
pub fn summarize_cat_scores(
    cat: ArrayView2<f64>,
    freqs: ArrayView1<f64>,
    mode: RankingScore,
) -> Array1<f64> {
    let squared = cat.mapv(|c| c * c);
    match mode {
        RankingScore::Entropy => squared.dot(&freqs.mapv(|f| 1.0 - f)),
        RankingScore::Avg => squared.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(cat.nrows())),
        RankingScore::Max => squared
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().fold(0.0, f64::max))
            .collect(),
    }
}

/// Orders the features of `scores` by decreasing importance. Equal scores keep
/// their original feature order.
pub fn rank_cat_scores<L>(scores: CatScores<L>, mode: RankingScore) -> RankingResult<L> {
    let summary = summarize_cat_scores(scores.cat.view(), scores.freqs.view(), mode);
    let mut order: Vec<usize> = (0..summary.len()).collect();
    order.sort_by(|&a, &b| summary[b].total_cmp(&summary[a]));

    RankingResult {
        score: summary.select(Axis(0), &order),
        cat: scores.cat.select(Axis(0), &order),
        order,
        labels: scores.labels,
        freqs: scores.freqs,
        regularization: scores.regularization,
        was_diagonal: scores.was_diagonal,
    }
}

/// Computes CAT scores and ranks the features by `config.ranking_score`.
pub fn rank_features<L: Clone + Ord>(
    x: ArrayView2<f64>,
    labels: &[L],
    config: &SdaConfig,
) -> Result<RankingResult<L>, SdaError> {
    let scores = catscore(x, labels, config)?;
    log::log!(
        config.progress_level(),
        "Ranking {} features by the {} score",
        scores.cat.nrows(),
        config.ranking_score
    );
    Ok(rank_cat_scores(scores, config.ranking_score))
}
