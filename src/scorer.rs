//! Item-item scorer: predicts a user's scores for items from the ratings the
//! user gave to similar items.
//!
//! ## Per call
//!
//! 1. Fetch the user's rating vector from the rating source (empty for unknown
//!    users; that just yields no predictions).
//! 2. Ask the normalizer for a transformation bound to this user and apply it
//!    to a working copy of the ratings.
//! 3. For every distinct requested item:
//!    - fetch its similarity row from the model (empty for unknown items),
//!    - keep the neighbors the user rated,
//!    - keep the best `neighborhood_size` of them by weight (all of them when
//!      the size is `<= 0`; equal weights at the cut go to the smaller id),
//!    - skip the item if fewer than `min_neighbors` survive,
//!    - hand the neighborhood to the neighborhood scorer.
//! 4. Undo the transformation on the collected scores.
//!
//! Items that cannot be predicted are absent from the output. Errors come only
//! from the rating source or the model and fail the whole call.
//!
//! ```
//! use std::sync::Arc;
//! use itemknn::builder::ItemItemScorerBuilder;
//! use itemknn::model::SimilarityMatrixModel;
//! use itemknn::source::InMemoryRatingSource;
//!
//! let source = InMemoryRatingSource::from_ratings(vec![(1, 10, 4.0), (1, 11, 2.0)]);
//! let model = SimilarityMatrixModel::from_triplets(vec![(20, 10, 0.5), (20, 11, 0.5)]);
//!
//! let scorer = ItemItemScorerBuilder::new()
//!     .with_neighborhood_size(20)
//!     .with_min_neighbors(1)
//!     .build(Arc::new(source), Arc::new(model));
//!
//! let scores = scorer.score(1, &[20, 99]).unwrap();
//! assert_eq!(scores.len(), 1);
//! assert!((scores[&20] - 3.0).abs() < 1e-12);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use itemknn_core::accumulator::{self, ScoredId, ScoredIdAccumulator, TopNScoredIdAccumulator};
use itemknn_core::SparseVector;
use log::{debug, info, trace};
use rayon::prelude::*;

use crate::accum::{BasicScoreAccumulator, DetailedScoreAccumulator, ItemItemScoreAccumulator};
use crate::error::ScoringResult;
use crate::model::ItemItemModel;
use crate::neighborhood::NeighborhoodScorer;
use crate::normalize::UserVectorNormalizer;
use crate::results::ResultMap;
use crate::source::RatingVectorSource;

/// Scores items with an item-item model. Cheap to share across threads.
#[derive(Clone)]
pub struct ItemItemScorer {
    source: Arc<dyn RatingVectorSource>,
    model: Arc<dyn ItemItemModel>,
    scorer: Arc<dyn NeighborhoodScorer>,
    normalizer: Arc<dyn UserVectorNormalizer>,
    neighborhood_size: i32,
    min_neighbors: usize,
}

impl std::fmt::Debug for ItemItemScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemItemScorer")
            .field("scorer", &self.scorer)
            .field("normalizer", &self.normalizer)
            .field("neighborhood_size", &self.neighborhood_size)
            .field("min_neighbors", &self.min_neighbors)
            .finish()
    }
}

impl ItemItemScorer {
    /// `neighborhood_size <= 0` means no limit on the neighborhood.
    pub fn new(
        source: Arc<dyn RatingVectorSource>,
        model: Arc<dyn ItemItemModel>,
        scorer: Arc<dyn NeighborhoodScorer>,
        normalizer: Arc<dyn UserVectorNormalizer>,
        neighborhood_size: i32,
        min_neighbors: usize,
    ) -> Self {
        debug!(
            "configured item-item scorer with scorer {:?}, normalizer {:?}, nnbrs={}, min={}",
            scorer, normalizer, neighborhood_size, min_neighbors
        );
        Self {
            source,
            model,
            scorer,
            normalizer,
            neighborhood_size,
            min_neighbors,
        }
    }

    pub fn normalizer(&self) -> &dyn UserVectorNormalizer {
        self.normalizer.as_ref()
    }

    pub fn neighborhood_size(&self) -> i32 {
        self.neighborhood_size
    }

    pub fn min_neighbors(&self) -> usize {
        self.min_neighbors
    }

    /// Predicted scores for `items`; unpredictable items are left out.
    pub fn score(&self, user: i64, items: &[i64]) -> ScoringResult<HashMap<i64, f64>> {
        debug!("scoring {} items for user {}", items.len(), user);
        let ratings = self.source.user_rating_vector(user)?;
        let mut accum = BasicScoreAccumulator::with_capacity(items.len());

        self.score_items(user, &ratings, items, &mut accum)?;

        Ok(accum.into_scores())
    }

    /// Like [`score`](Self::score), with the neighborhood behind each
    /// prediction. Results follow the first occurrence of each item in `items`.
    pub fn score_with_details(&self, user: i64, items: &[i64]) -> ScoringResult<ResultMap> {
        debug!("scoring {} items for user {} with details", items.len(), user);
        let ratings = self.source.user_rating_vector(user)?;
        let mut accum = DetailedScoreAccumulator::with_capacity(items.len());

        self.score_items(user, &ratings, items, &mut accum)?;

        Ok(accum.into_result_map())
    }

    /// Predicted score for a single item, `None` if it cannot be predicted.
    pub fn score_item(&self, user: i64, item: i64) -> ScoringResult<Option<f64>> {
        Ok(self.score(user, &[item])?.get(&item).copied())
    }

    /// Score several `(user, items)` requests in parallel.
    ///
    /// Output is in request order. The first failing request fails the batch.
    pub fn score_users(
        &self,
        requests: &[(i64, Vec<i64>)],
    ) -> ScoringResult<Vec<HashMap<i64, f64>>> {
        info!(
            "batch scoring {} users on {} threads",
            requests.len(),
            rayon::current_num_threads()
        );
        requests
            .par_iter()
            .map(|(user, items)| self.score(*user, items))
            .collect()
    }

    /// Top `n` predicted items for `user`, best first (ties to the smaller id).
    ///
    /// Candidates default to every item in the model. Items the user already
    /// rated are never recommended.
    pub fn recommend(
        &self,
        user: i64,
        n: usize,
        candidates: Option<&[i64]>,
    ) -> ScoringResult<Vec<ScoredId>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let ratings = self.source.user_rating_vector(user)?;
        let candidates: Vec<i64> = match candidates {
            Some(items) => items.to_vec(),
            None => self.model.item_universe(),
        }
        .into_iter()
        .filter(|&item| !ratings.contains_key(item))
        .collect();
        debug!(
            "recommending {} of {} candidates for user {}",
            n,
            candidates.len(),
            user
        );

        let mut accum = BasicScoreAccumulator::with_capacity(candidates.len());
        self.score_items(user, &ratings, &candidates, &mut accum)?;

        let scores = accum.into_scores();
        let mut top = TopNScoredIdAccumulator::new(n.min(scores.len().max(1)));
        for (item, score) in scores {
            top.put(item, score);
        }
        Ok(top.finish_list())
    }

    /// Score all items into an accumulator.
    fn score_items(
        &self,
        user: i64,
        ratings: &SparseVector,
        items: &[i64],
        accum: &mut dyn ItemItemScoreAccumulator,
    ) -> ScoringResult<()> {
        trace!("user {} has {} ratings", user, ratings.len());

        let transform = self.normalizer.make_transformation(user, ratings);
        let mut normed = ratings.mutable_copy();
        transform.apply(&mut normed);
        let user_data = normed.freeze();

        let mut seen: HashSet<i64> = HashSet::with_capacity(items.len());
        for &item in items {
            if seen.insert(item) {
                self.score_item_into(&user_data, item, accum)?;
            }
        }

        accum.apply_reversed_transform(transform.as_ref());
        Ok(())
    }

    fn score_item_into(
        &self,
        user_data: &SparseVector,
        item: i64,
        accum: &mut dyn ItemItemScoreAccumulator,
    ) -> ScoringResult<()> {
        let all_neighbors = self.model.neighbors(item)?;
        let mut acc = accumulator::for_size(self.neighborhood_size);

        for (nbr, weight) in all_neighbors.iter() {
            if user_data.contains_key(nbr) {
                acc.put(nbr, weight);
            }
        }

        let neighborhood = acc.finish_map();
        debug_assert!(
            self.neighborhood_size <= 0 || neighborhood.len() <= self.neighborhood_size as usize,
            "neighborhood of {} exceeds limit {}",
            neighborhood.len(),
            self.neighborhood_size
        );
        if neighborhood.len() < self.min_neighbors {
            trace!(
                "item {} has {} usable neighbors, {} required",
                item,
                neighborhood.len(),
                self.min_neighbors
            );
            return Ok(());
        }

        trace!(
            "scoring item {} with {} of {} neighbors",
            item,
            neighborhood.len(),
            all_neighbors.len()
        );
        self.scorer.score(item, &neighborhood, user_data, accum);
        Ok(())
    }
}
