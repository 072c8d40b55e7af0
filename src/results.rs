//! Detailed scoring results.

use std::collections::HashMap;

use itemknn_core::{ScoredId, SparseVector};
use serde::{Deserialize, Serialize};

/// Prediction for one item together with the neighborhood that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemItemResult {
    pub item: i64,
    pub score: f64,
    /// Number of neighbors that contributed.
    pub neighborhood_size: usize,
    /// Total absolute similarity weight of those neighbors.
    pub neighbor_weight: f64,
    /// Contributing neighbors and their weights, strongest first.
    pub neighbors: Vec<ScoredId>,
}

impl ItemItemResult {
    pub fn new(item: i64, score: f64, neighborhood: &SparseVector, neighbor_weight: f64) -> Self {
        let mut neighbors: Vec<ScoredId> = neighborhood
            .iter()
            .map(|(id, w)| ScoredId::new(id, w))
            .collect();
        neighbors.sort_by(|a, b| a.rank_cmp(b));

        Self {
            item,
            score,
            neighborhood_size: neighborhood.len(),
            neighbor_weight,
            neighbors,
        }
    }
}

/// Results in request order with lookup by item id.
///
/// An item occurs at most once; adding it again replaces the earlier result
/// but keeps its position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultMap {
    results: Vec<ItemItemResult>,
    index: HashMap<i64, usize>,
}

impl ResultMap {
    pub fn new(results: Vec<ItemItemResult>) -> Self {
        let mut map = Self {
            results: Vec::with_capacity(results.len()),
            index: HashMap::with_capacity(results.len()),
        };
        for r in results {
            map.insert(r);
        }
        map
    }

    fn insert(&mut self, result: ItemItemResult) {
        match self.index.get(&result.item) {
            Some(&pos) => self.results[pos] = result,
            None => {
                self.index.insert(result.item, self.results.len());
                self.results.push(result);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, item: i64) -> Option<&ItemItemResult> {
        self.index.get(&item).map(|&pos| &self.results[pos])
    }

    pub fn score(&self, item: i64) -> Option<f64> {
        self.get(item).map(|r| r.score)
    }

    pub fn contains(&self, item: i64) -> bool {
        self.index.contains_key(&item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemItemResult> {
        self.results.iter()
    }

    /// Plain `item -> score` view.
    pub fn score_map(&self) -> HashMap<i64, f64> {
        self.results.iter().map(|r| (r.item, r.score)).collect()
    }

    pub fn into_vec(self) -> Vec<ItemItemResult> {
        self.results
    }
}

impl IntoIterator for ResultMap {
    type Item = ItemItemResult;
    type IntoIter = std::vec::IntoIter<ItemItemResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultMap {
    type Item = &'a ItemItemResult;
    type IntoIter = std::slice::Iter<'a, ItemItemResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
