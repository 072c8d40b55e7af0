//! Neighborhood scorers: turn one item's neighborhood into a prediction.
//!
//! The neighborhood handed in is already restricted to items the user rated
//! and already truncated; scorers only aggregate. A scorer that has nothing to
//! say about an item writes nothing.

use std::fmt;
use std::str::FromStr;

use itemknn_core::SparseVector;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::accum::ItemItemScoreAccumulator;

pub trait NeighborhoodScorer: Send + Sync + fmt::Debug {
    /// Score `item` from its `neighbors` (id -> similarity) and the user's
    /// normalized `scores`, writing the result into `accum`.
    fn score(
        &self,
        item: i64,
        neighbors: &SparseVector,
        scores: &SparseVector,
        accum: &mut dyn ItemItemScoreAccumulator,
    );
}

/// Similarity-weighted average of the user's ratings:
/// `Σ w(n)·r(n) / Σ |w(n)|`. No score when the weights sum to zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedAverageNeighborhoodScorer;

impl NeighborhoodScorer for WeightedAverageNeighborhoodScorer {
    fn score(
        &self,
        item: i64,
        neighbors: &SparseVector,
        scores: &SparseVector,
        accum: &mut dyn ItemItemScoreAccumulator,
    ) {
        let sum = neighbors.dot(scores);
        let weight = neighbors.sum_abs();
        if weight > 0.0 {
            accum.put(item, sum / weight, neighbors, weight);
        } else {
            trace!("item {} has zero neighbor weight, not scored", item);
        }
    }
}

/// Sum of neighbor similarities, ignoring rating values. Suited to unary
/// (implicit) feedback.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimilaritySumNeighborhoodScorer;

impl NeighborhoodScorer for SimilaritySumNeighborhoodScorer {
    fn score(
        &self,
        item: i64,
        neighbors: &SparseVector,
        _scores: &SparseVector,
        accum: &mut dyn ItemItemScoreAccumulator,
    ) {
        if neighbors.is_empty() {
            return;
        }
        accum.put(item, neighbors.sum(), neighbors, neighbors.sum_abs());
    }
}

/// Scorer selection for configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    WeightedAverage,
    SimilaritySum,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::WeightedAverage => "weighted_average",
            ScorerKind::SimilaritySum => "similarity_sum",
        }
    }

    pub fn build(&self) -> Box<dyn NeighborhoodScorer> {
        match self {
            ScorerKind::WeightedAverage => Box::new(WeightedAverageNeighborhoodScorer),
            ScorerKind::SimilaritySum => Box::new(SimilaritySumNeighborhoodScorer),
        }
    }
}

impl FromStr for ScorerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted_average" => Ok(ScorerKind::WeightedAverage),
            "similarity_sum" => Ok(ScorerKind::SimilaritySum),
            _ => Err(()),
        }
    }
}
