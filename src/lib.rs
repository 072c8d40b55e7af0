//! Item-item collaborative filtering.
//!
//! Predicts how a user would score an item from the user's ratings of the
//! item's most similar neighbors, under a reversible per-user normalization.
//!
//! # Modules
//!
//! - [`scorer`]: the item-item scorer (`score`, `score_with_details`, batch scoring, top-n)
//! - [`builder`]: configuration, typed config map, JSON persistence, scorer builder
//! - [`model`]: neighborhood models (sparse similarity matrix)
//! - [`source`]: rating vector sources
//! - [`normalize`]: per-user reversible normalizers
//! - [`neighborhood`]: neighborhood scoring strategies
//! - [`accum`]: score accumulators shared by plain and detailed scoring
//! - [`results`]: detailed results
//! - [`error`]: error type

pub mod accum;
pub mod builder;
pub mod error;
pub mod model;
pub mod neighborhood;
pub mod normalize;
pub mod results;
pub mod scorer;
pub mod source;

pub use builder::{ItemItemConfig, ItemItemScorerBuilder};
pub use error::{ScoringError, ScoringResult};
pub use itemknn_core::{ScoredId, SparseVector};
pub use scorer::ItemItemScorer;

#[cfg(test)]
mod tests;
