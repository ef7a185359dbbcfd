//! Insertion-ordered tallies.
//!
//! Frequency tables and graphs report entries in first-encounter order, and
//! top-N selection sorts stably, so equal counts keep that order.

use std::collections::HashMap;
use std::hash::Hash;

use crate::CountEntry;

/// Values that can absorb a partial tally of the same key.
pub(crate) trait Absorb {
    fn absorb(&mut self, other: Self);
}

impl Absorb for u64 {
    fn absorb(&mut self, other: Self) {
        *self += other;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OrderedCounts<K, V = u64> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedCounts<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Default> OrderedCounts<K, V> {
    /// Value for `key`, inserted with its default on first sight.
    pub(crate) fn entry(&mut self, key: K) -> &mut V {
        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(key.clone(), slot);
                self.entries.push((key, V::default()));
                slot
            }
        };
        &mut self.entries[slot].1
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|slot| &self.entries[*slot].1)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K: Eq + Hash + Clone, V: Default + Absorb> OrderedCounts<K, V> {
    /// Fold a later shard in; its new keys are appended after ours.
    pub(crate) fn merge(&mut self, other: Self) {
        for (key, value) in other.entries {
            self.entry(key).absorb(value);
        }
    }
}

impl<K: Eq + Hash + Clone> OrderedCounts<K, u64> {
    pub(crate) fn bump(&mut self, key: K) {
        *self.entry(key) += 1;
    }

    /// Entries sorted by descending count, ties in first-encounter order,
    /// truncated to `limit` when given.
    pub(crate) fn top(&self, limit: Option<usize>) -> Vec<CountEntry<K>> {
        let mut rows: Vec<CountEntry<K>> = self
            .entries
            .iter()
            .map(|(key, count)| CountEntry {
                key: key.clone(),
                count: *count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }
}
