//! Numeric building blocks for item-item scoring.
//!
//! - [`vector`]: immutable and fixed-domain mutable sparse vectors keyed by item id
//! - [`accumulator`]: bounded (top-n) and unlimited scored-id accumulators

pub mod accumulator;
pub mod vector;

pub use accumulator::{
    ScoredId, ScoredIdAccumulator, TopNScoredIdAccumulator, UnlimitedScoredIdAccumulator,
};
pub use vector::{MutableSparseVector, SparseVector};


#[cfg(test)]
pub(crate) fn init() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("debug");
        let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
    });
}
