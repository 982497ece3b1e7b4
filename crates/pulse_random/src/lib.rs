//! # pulse_random
//!
//! A weighted random selection container: an ordered list of `(item,
//! weight)` entries where each pick lands on an item with probability
//! `weight / total_weight`.
//!
//! Sampling is generic over [`rand::Rng`] so callers (and tests) can
//! inject a seeded generator; [`WeightedList::pick`] uses the thread-local
//! one.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One weighted entry in a [`WeightedList`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEntry<T> {
    /// The stored item.
    pub item: T,
    /// Weight influencing pick probability; should be positive.
    pub weight: f32,
}

/// An ordered collection of weighted items with proportional random
/// selection.
///
/// Entries keep insertion order; `remove` and `set_weight` act on the
/// first occurrence of an item, matching list semantics rather than set
/// semantics — the same item may appear more than once with different
/// weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedList<T> {
    entries: Vec<WeightedEntry<T>>,
}

impl<T> Default for WeightedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> WeightedList<T> {
    /// Create a new empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an item with the given weight.
    pub fn push(&mut self, item: T, weight: f32) {
        self.entries.push(WeightedEntry { item, weight });
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f32 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }

    /// The entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[WeightedEntry<T>] {
        &self.entries
    }

    /// Pick an item with probability proportional to its weight, using the
    /// supplied generator. Returns `None` if the list is empty.
    ///
    /// If every weight is zero the first entry is returned; negative
    /// weights are not meaningful and skew the distribution.
    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        if self.entries.is_empty() {
            return None;
        }

        let total = self.total_weight();
        let value = rng.gen::<f32>() * total;

        let mut accumulated = 0.0;
        for entry in &self.entries {
            accumulated += entry.weight;
            if accumulated >= value {
                return Some(&entry.item);
            }
        }

        // Float accumulation drift can leave `value` above the final sum.
        self.entries.last().map(|entry| &entry.item)
    }

    /// Pick an item using the thread-local generator.
    pub fn pick(&self) -> Option<&T> {
        self.pick_with(&mut rand::thread_rng())
    }
}

impl<T: PartialEq> WeightedList<T> {
    /// Remove the first occurrence of `item`.
    ///
    /// Returns `true` if an entry was found and removed.
    pub fn remove(&mut self, item: &T) -> bool {
        if let Some(pos) = self.entries.iter().position(|entry| entry.item == *item) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    /// Set the weight of the first occurrence of `item`.
    ///
    /// Returns `true` if an entry was found and updated.
    pub fn set_weight(&mut self, item: &T, weight: f32) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.item == *item) {
            entry.weight = weight;
            true
        } else {
            false
        }
    }
}
