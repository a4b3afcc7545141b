//! Ordered frequency table
//!
//! A `Tally` maps keys to accumulated `f64` values and iterates them in
//! descending order of value. Keys that share a value keep the order in which
//! they were first inserted.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

/// Strategy used by [`Tally::balanced_add`] to weight each key of a group.
pub trait Weighting: fmt::Debug {
    /// Amount added to every key of a group holding `group_len` keys.
    fn weight(&self, group_len: usize) -> f64;
}

/// Every key of a group counts once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frequency;

impl Weighting for Frequency {
    fn weight(&self, _group_len: usize) -> f64 {
        1.0
    }
}

/// A group contributes one unit in total, split evenly between its keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Split;

impl Weighting for Split {
    fn weight(&self, group_len: usize) -> f64 {
        if group_len == 0 {
            return 0.0;
        }
        1.0 / group_len as f64
    }
}

/// Position of a key in the descending order.
#[derive(Debug, Clone, Copy)]
struct Rank {
    value: f64,
    /// First-insertion sequence number (tie breaker)
    seq: u64,
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Associative container sorted descending by accumulated value.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    ranks: HashMap<K, Rank>,
    order: BTreeMap<Rank, K>,
    next_seq: u64,
}

impl<K> Default for Tally<K> {
    fn default() -> Self {
        Self {
            ranks: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.ranks.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.ranks.get(key).map(|rank| rank.value)
    }

    /// Set the value of `key`, returning the previous value.
    ///
    /// An overwritten key keeps its original tie-breaking position.
    pub fn put(&mut self, key: K, value: f64) -> Option<f64> {
        debug_assert!(!value.is_nan(), "tally values must not be NaN");
        match self.ranks.get_mut(&key) {
            Some(rank) => {
                let previous = *rank;
                rank.value = value;
                let updated = *rank;
                self.order.remove(&previous);
                self.order.insert(updated, key);
                Some(previous.value)
            }
            None => {
                let rank = Rank {
                    value,
                    seq: self.next_seq,
                };
                self.next_seq += 1;
                self.ranks.insert(key.clone(), rank);
                self.order.insert(rank, key);
                None
            }
        }
    }

    /// Add `delta` to the value of `key` (absent keys start at zero) and
    /// return the new value.
    pub fn sum(&mut self, key: K, delta: f64) -> f64 {
        let value = self.get(&key).unwrap_or(0.0) + delta;
        self.put(key, value);
        value
    }

    /// Add one weighted unit to every key of `group`.
    pub fn balanced_add(&mut self, group: &[K], weighting: &dyn Weighting) {
        let weight = weighting.weight(group.len());
        for key in group {
            self.sum(key.clone(), weight);
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<f64> {
        let rank = self.ranks.remove(key)?;
        self.order.remove(&rank);
        Some(rank.value)
    }

    pub fn clear(&mut self) {
        self.ranks.clear();
        self.order.clear();
    }

    /// Highest-valued entry.
    pub fn first(&self) -> Option<(&K, f64)> {
        self.iter().next()
    }

    /// Leader and runner-up.
    pub fn top_two(&self) -> (Option<(&K, f64)>, Option<(&K, f64)>) {
        let mut entries = self.iter();
        (entries.next(), entries.next())
    }

    /// Entries in descending order of value.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.order.iter().map(|(rank, key)| (key, rank.value))
    }
}

impl<K: Eq + Hash + Clone> FromIterator<(K, f64)> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for (key, value) in iter {
            tally.sum(key, value);
        }
        tally
    }
}

#[cfg(test)]
#[path = "tally_tests.rs"]
mod tally_tests;
