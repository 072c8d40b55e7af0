//! Item-item neighborhood models.
//!
//! A model answers one question: for an item, which other items are similar
//! and how strongly (`neighbor id -> weight`, weights may be negative).
//! Building the similarities is someone else's job; `SimilarityMatrixModel`
//! only stores precomputed ones.
//!
//! ## Storage
//!
//! Item ids are mapped onto a dense `0..n` index and the similarities are kept
//! as an `n × n` CSR matrix (`sprs::CsMat`), one row per target item. A
//! neighbor lookup is a hash lookup for the row plus a copy of its non-zeros.

use std::collections::HashMap;

use itemknn_core::SparseVector;
use log::{debug, info, trace};
use sprs::{CsMat, TriMat};

use crate::error::ScoringResult;

/// Source of similarity rows.
pub trait ItemItemModel: Send + Sync {
    /// Neighbors of `item` with their similarity weights; empty if the item
    /// is unknown to the model.
    fn neighbors(&self, item: i64) -> ScoringResult<SparseVector>;

    /// Every item the model knows about, ascending.
    fn item_universe(&self) -> Vec<i64>;
}

/// In-memory model over a sparse similarity matrix.
#[derive(Clone, Debug)]
pub struct SimilarityMatrixModel {
    item_ids: Vec<i64>,
    index: HashMap<i64, usize>,
    matrix: CsMat<f64>,
}

impl SimilarityMatrixModel {
    /// Build from `(item, neighbor, weight)` triplets.
    ///
    /// Self-similarities and non-finite weights are dropped. A repeated
    /// `(item, neighbor)` pair keeps the last weight.
    pub fn from_triplets<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64, f64)>,
    {
        let entries: Vec<(i64, i64, f64)> = entries.into_iter().collect();

        let mut item_ids: Vec<i64> = entries
            .iter()
            .flat_map(|&(i, j, _)| [i, j])
            .collect();
        item_ids.sort_unstable();
        item_ids.dedup();
        let index: HashMap<i64, usize> = item_ids
            .iter()
            .enumerate()
            .map(|(pos, &id)| (id, pos))
            .collect();
        let n = item_ids.len();

        // TriMat sums duplicates, so collapse them first
        let mut cells: HashMap<(usize, usize), f64> = HashMap::with_capacity(entries.len());
        for (item, nbr, w) in entries {
            if item == nbr {
                trace!("dropping self-similarity of item {}", item);
                continue;
            }
            if !w.is_finite() {
                debug!("dropping non-finite weight {} for ({}, {})", w, item, nbr);
                continue;
            }
            cells.insert((index[&item], index[&nbr]), w);
        }

        let mut triplets: Vec<((usize, usize), f64)> = cells.into_iter().collect();
        triplets.sort_unstable_by_key(|&((i, j), _)| (i, j));

        let mut trimat = TriMat::with_capacity((n, n), triplets.len());
        for ((i, j), w) in triplets {
            trimat.add_triplet(i, j, w);
        }
        let matrix: CsMat<f64> = trimat.to_csr();

        info!(
            "Built similarity model over {} items with {} non-zeros",
            n,
            matrix.nnz()
        );

        Self {
            item_ids,
            index,
            matrix,
        }
    }

    /// Build from per-item similarity rows.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, SparseVector)>,
    {
        let triplets: Vec<(i64, i64, f64)> = rows
            .into_iter()
            .flat_map(|(item, row)| {
                row.iter()
                    .map(move |(nbr, w)| (item, nbr, w))
                    .collect::<Vec<_>>()
            })
            .collect();
        Self::from_triplets(triplets)
    }

    pub fn n_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Number of stored similarities.
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    fn row(&self, item: i64) -> SparseVector {
        let Some(&pos) = self.index.get(&item) else {
            trace!("item {} unknown to the model", item);
            return SparseVector::empty();
        };
        match self.matrix.outer_view(pos) {
            Some(row) => row
                .iter()
                .map(|(j, &w)| (self.item_ids[j], w))
                .collect(),
            None => SparseVector::empty(),
        }
    }
}

impl ItemItemModel for SimilarityMatrixModel {
    fn neighbors(&self, item: i64) -> ScoringResult<SparseVector> {
        Ok(self.row(item))
    }

    fn item_universe(&self) -> Vec<i64> {
        self.item_ids.clone()
    }
}
