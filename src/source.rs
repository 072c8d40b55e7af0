//! Rating sources: where a user's rating vector comes from.

use std::collections::HashMap;

use itemknn_core::SparseVector;
use log::{debug, trace};

use crate::error::ScoringResult;

/// Provides the rating vector of a user.
///
/// Unknown users yield an empty vector, not an error. Errors are reserved for
/// failures of the underlying store and abort the scoring call that hit them.
pub trait RatingVectorSource: Send + Sync {
    fn user_rating_vector(&self, user: i64) -> ScoringResult<SparseVector>;
}

/// Rating vectors held in memory, keyed by user id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRatingSource {
    ratings: HashMap<i64, SparseVector>,
}

impl InMemoryRatingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(user, item, rating)` triples. A repeated `(user, item)`
    /// keeps the last rating.
    pub fn from_ratings<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64, f64)>,
    {
        let mut by_user: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
        for (user, item, rating) in triples {
            by_user.entry(user).or_default().push((item, rating));
        }

        let ratings: HashMap<i64, SparseVector> = by_user
            .into_iter()
            .map(|(user, pairs)| (user, SparseVector::from_pairs(pairs)))
            .collect();
        debug!("in-memory rating source with {} users", ratings.len());

        Self { ratings }
    }

    /// Replace the rating vector of `user`.
    pub fn insert_user(&mut self, user: i64, ratings: SparseVector) {
        trace!("storing {} ratings for user {}", ratings.len(), user);
        self.ratings.insert(user, ratings);
    }

    pub fn n_users(&self) -> usize {
        self.ratings.len()
    }

    /// User ids in ascending order.
    pub fn users(&self) -> Vec<i64> {
        let mut users: Vec<i64> = self.ratings.keys().copied().collect();
        users.sort_unstable();
        users
    }
}

impl RatingVectorSource for InMemoryRatingSource {
    fn user_rating_vector(&self, user: i64) -> ScoringResult<SparseVector> {
        Ok(self.ratings.get(&user).cloned().unwrap_or_default())
    }
}
