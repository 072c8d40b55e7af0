//! Sparse vectors keyed by item id.
//!
//! Two flavours share the same sorted-array layout (`keys` ascending, `values`
//! parallel to it):
//! - `SparseVector`: immutable, cheap to share, binary-search lookup.
//! - `MutableSparseVector`: fixed key domain, values can be set, changed or
//!   unset in place. Used for per-call working copies that get normalized.
//!
//! ```
//! use itemknn_core::vector::SparseVector;
//!
//! let v = SparseVector::from_pairs(vec![(3, 1.0), (1, 5.0), (2, 3.0)]);
//! assert_eq!(v.len(), 3);
//! assert_eq!(v.get(1), Some(5.0));
//! assert_eq!(v.get(7), None);
//! assert_eq!(v.keys(), &[1, 2, 3]);
//! ```

use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};

/// Immutable mapping from item id to a real value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    keys: Vec<i64>,
    values: Vec<f64>,
}

impl SparseVector {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(id, value)` pairs in any order.
    ///
    /// If an id appears more than once the last value wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let mut entries: Vec<(i64, f64)> = pairs.into_iter().collect();
        // stable: equal keys keep their input order, so the last one is kept below
        entries.sort_by_key(|&(k, _)| k);

        let mut keys: Vec<i64> = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            if keys.last() == Some(&k) {
                if let Some(last) = values.last_mut() {
                    *last = v;
                }
            } else {
                keys.push(k);
                values.push(v);
            }
        }

        Self { keys, values }
    }

    pub fn from_map(map: &HashMap<i64, f64>) -> Self {
        Self::from_pairs(map.iter().map(|(&k, &v)| (k, v)))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    fn position(&self, key: i64) -> Option<usize> {
        self.keys.binary_search(&key).ok()
    }

    /// Value for `key`, `None` if the key is not present.
    #[inline]
    pub fn get(&self, key: i64) -> Option<f64> {
        self.position(key).map(|i| self.values[i])
    }

    /// Value for `key`, or `default` if the key is not present.
    #[inline]
    pub fn get_or(&self, key: i64, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    #[inline]
    pub fn contains_key(&self, key: i64) -> bool {
        self.position(key).is_some()
    }

    /// Iterate `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.keys.iter().copied().zip(self.values.iter().copied())
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    /// Values in key order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn sum_abs(&self) -> f64 {
        self.values.iter().map(|v| v.abs()).sum()
    }

    /// Arithmetic mean of the values, `None` for an empty vector.
    pub fn mean(&self) -> Option<f64> {
        match self.len() {
            0 => None,
            n => Some(self.sum() / n as f64),
        }
    }

    /// Euclidean norm of the values.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dot product over the shared keys (merge over both sorted key arrays).
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0usize, 0usize);
        let mut acc = 0.0;
        while i < self.keys.len() && j < other.keys.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Mutable copy with this vector's keys as its domain, all values set.
    pub fn mutable_copy(&self) -> MutableSparseVector {
        trace!("mutable copy of sparse vector with {} entries", self.len());
        MutableSparseVector {
            keys: self.keys.clone(),
            values: self.values.clone(),
            used: vec![true; self.keys.len()],
        }
    }

    pub fn to_map(&self) -> HashMap<i64, f64> {
        self.iter().collect()
    }
}

impl FromIterator<(i64, f64)> for SparseVector {
    fn from_iter<T: IntoIterator<Item = (i64, f64)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// Sparse vector with a fixed key domain and mutable values.
///
/// Keys outside the domain can never be set. Unset keys stay in the domain
/// but are skipped by lookup and iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutableSparseVector {
    keys: Vec<i64>,
    values: Vec<f64>,
    used: Vec<bool>,
}

impl MutableSparseVector {
    /// Empty vector over `domain`; no key is set yet.
    pub fn with_domain<I>(domain: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let mut keys: Vec<i64> = domain.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();
        let n = keys.len();
        Self {
            keys,
            values: vec![0.0; n],
            used: vec![false; n],
        }
    }

    #[inline]
    fn position(&self, key: i64) -> Option<usize> {
        self.keys.binary_search(&key).ok()
    }

    /// Number of keys currently set.
    pub fn len(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.used.iter().any(|&u| u)
    }

    /// Size of the key domain, set or not.
    pub fn domain_size(&self) -> usize {
        self.keys.len()
    }

    pub fn get(&self, key: i64) -> Option<f64> {
        self.position(key)
            .filter(|&i| self.used[i])
            .map(|i| self.values[i])
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.get(key).is_some()
    }

    /// Set `key` to `value`. Returns `false` (and changes nothing) if `key`
    /// is outside the domain.
    pub fn set(&mut self, key: i64, value: f64) -> bool {
        match self.position(key) {
            Some(i) => {
                self.values[i] = value;
                self.used[i] = true;
                true
            }
            None => false,
        }
    }

    /// Clear `key`, returning its previous value if it was set.
    pub fn unset(&mut self, key: i64) -> Option<f64> {
        let i = self.position(key).filter(|&i| self.used[i])?;
        self.used[i] = false;
        Some(self.values[i])
    }

    /// Rewrite every set value in place with `f(key, value)`.
    pub fn map_values<F>(&mut self, mut f: F)
    where
        F: FnMut(i64, f64) -> f64,
    {
        for ((k, v), used) in self
            .keys
            .iter()
            .zip(self.values.iter_mut())
            .zip(self.used.iter())
        {
            if *used {
                *v = f(*k, *v);
            }
        }
    }

    /// Iterate set `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .zip(self.used.iter())
            .filter(|(_, used)| **used)
            .map(|((k, v), _)| (*k, *v))
    }

    /// Immutable snapshot of the set entries.
    pub fn immutable(&self) -> SparseVector {
        let (keys, values) = self.iter().unzip();
        SparseVector { keys, values }
    }

    /// Consume into an immutable vector of the set entries.
    pub fn freeze(self) -> SparseVector {
        if self.used.iter().all(|&u| u) {
            return SparseVector {
                keys: self.keys,
                values: self.values,
            };
        }
        self.immutable()
    }
}
