//! Scored-id accumulators
//!
//! Collect `(id, score)` candidates and hand back either the best `n` of them
//! (`TopNScoredIdAccumulator`) or all of them (`UnlimitedScoredIdAccumulator`).
//!
//! Ranking used everywhere in this module: higher score first, then smaller id.
//! Two candidates with the same score at the truncation boundary are therefore
//! resolved the same way regardless of the order they were offered in.
//!
//! The bounded variant keeps a size-limited min-heap (the worst retained
//! candidate sits on top), so offering `c` candidates costs `O(c log n)`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::vector::SparseVector;

/// Upper bound on the heap space reserved up front; larger heaps grow on demand.
const MAX_RESERVED: usize = 64;

/// An id paired with its score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: i64,
    pub score: f64,
}

impl ScoredId {
    pub fn new(id: i64, score: f64) -> Self {
        Self { id, score }
    }

    /// `Less` if `self` ranks before `other` (higher score, then smaller id).
    #[inline]
    pub fn rank_cmp(&self, other: &ScoredId) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Heap entry: the worst ranked candidate compares greatest and sits on top.
#[derive(Debug, Clone, Copy)]
struct Retained(ScoredId);

impl PartialEq for Retained {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Retained {}

impl PartialOrd for Retained {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Retained {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Collector of scored ids.
pub trait ScoredIdAccumulator: fmt::Debug {
    /// Number of candidates currently retained.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer a candidate. NaN scores are ignored.
    fn put(&mut self, id: i64, score: f64);

    /// Retained candidates, best first. Resets the accumulator.
    fn finish_list(&mut self) -> Vec<ScoredId>;

    /// Retained candidates as an id -> score vector. Resets the accumulator.
    ///
    /// An id offered more than once keeps its best retained score.
    fn finish_map(&mut self) -> SparseVector {
        // worst first, so a repeated id ends up holding its best score
        SparseVector::from_pairs(
            self.finish_list()
                .into_iter()
                .rev()
                .map(|s| (s.id, s.score)),
        )
    }
}

/// Pick the accumulator for a neighborhood size: bounded when `size > 0`,
/// unlimited otherwise.
pub fn for_size(size: i32) -> Box<dyn ScoredIdAccumulator> {
    if size > 0 {
        Box::new(TopNScoredIdAccumulator::new(size as usize))
    } else {
        Box::new(UnlimitedScoredIdAccumulator::new())
    }
}

/// Keeps the `n` best candidates.
///
/// Every `put` is a separate candidate, so a repeated id can hold more than
/// one slot until the accumulator is finished.
#[derive(Debug, Clone)]
pub struct TopNScoredIdAccumulator {
    capacity: usize,
    heap: BinaryHeap<Retained>,
}

impl TopNScoredIdAccumulator {
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "top-n accumulator needs a positive capacity");
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(MAX_RESERVED)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ScoredIdAccumulator for TopNScoredIdAccumulator {
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn put(&mut self, id: i64, score: f64) {
        if score.is_nan() {
            trace!("ignoring NaN score for id {}", id);
            return;
        }
        let candidate = Retained(ScoredId::new(id, score));

        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if candidate < *worst {
                *worst = candidate;
            }
        }
        debug_assert!(self.heap.len() <= self.capacity);
    }

    fn finish_list(&mut self) -> Vec<ScoredId> {
        let heap = std::mem::take(&mut self.heap);
        // ascending by `Retained` order is best first
        heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }
}

/// Keeps every candidate; a repeated id keeps its last score.
#[derive(Debug, Clone, Default)]
pub struct UnlimitedScoredIdAccumulator {
    scores: HashMap<i64, f64>,
}

impl UnlimitedScoredIdAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoredIdAccumulator for UnlimitedScoredIdAccumulator {
    fn len(&self) -> usize {
        self.scores.len()
    }

    fn put(&mut self, id: i64, score: f64) {
        if score.is_nan() {
            trace!("ignoring NaN score for id {}", id);
            return;
        }
        self.scores.insert(id, score);
    }

    fn finish_list(&mut self) -> Vec<ScoredId> {
        let mut list: Vec<ScoredId> = self
            .scores
            .drain()
            .map(|(id, score)| ScoredId::new(id, score))
            .collect();
        list.sort_unstable_by(|a, b| a.rank_cmp(b));
        list
    }

    fn finish_map(&mut self) -> SparseVector {
        SparseVector::from_pairs(self.scores.drain())
    }
}
