//! Score accumulators: where a neighborhood scorer writes its prediction.
//!
//! The scoring routine is written once against `ItemItemScoreAccumulator`;
//! the basic accumulator keeps a bare `item -> score` map while the detailed
//! one records the neighborhood behind every score.

use std::collections::HashMap;

use itemknn_core::SparseVector;

use crate::normalize::VectorTransformation;
use crate::results::{ItemItemResult, ResultMap};

pub trait ItemItemScoreAccumulator {
    /// Record the raw (still normalized) score of `item`.
    fn put(&mut self, item: i64, score: f64, neighborhood: &SparseVector, neighbor_weight: f64);

    /// Map every recorded score back to the rating scale, in place.
    fn apply_reversed_transform(&mut self, transform: &dyn VectorTransformation);
}

#[derive(Debug, Default)]
pub struct BasicScoreAccumulator {
    scores: HashMap<i64, f64>,
}

impl BasicScoreAccumulator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: HashMap::with_capacity(capacity),
        }
    }

    pub fn into_scores(self) -> HashMap<i64, f64> {
        self.scores
    }
}

impl ItemItemScoreAccumulator for BasicScoreAccumulator {
    fn put(&mut self, item: i64, score: f64, _neighborhood: &SparseVector, _neighbor_weight: f64) {
        self.scores.insert(item, score);
    }

    fn apply_reversed_transform(&mut self, transform: &dyn VectorTransformation) {
        for (&item, score) in self.scores.iter_mut() {
            *score = transform.unapply_score(item, *score);
        }
    }
}

#[derive(Debug, Default)]
pub struct DetailedScoreAccumulator {
    results: Vec<ItemItemResult>,
}

impl DetailedScoreAccumulator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub fn into_result_map(self) -> ResultMap {
        ResultMap::new(self.results)
    }
}

impl ItemItemScoreAccumulator for DetailedScoreAccumulator {
    fn put(&mut self, item: i64, score: f64, neighborhood: &SparseVector, neighbor_weight: f64) {
        self.results
            .push(ItemItemResult::new(item, score, neighborhood, neighbor_weight));
    }

    fn apply_reversed_transform(&mut self, transform: &dyn VectorTransformation) {
        for r in self.results.iter_mut() {
            r.score = transform.unapply_score(r.item, r.score);
        }
    }
}
