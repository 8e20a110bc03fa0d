//! Least-recently-used ordering for scope entries.

use std::collections::BTreeMap;
use std::hash::Hash;

use crate::internal::FastMap;

/// Orders keys by their last touch.
///
/// Every touch takes a fresh stamp from a monotonic counter, so no two keys
/// ever share a recency. The oldest stamp is the eviction candidate; among
/// keys never touched again after insertion that is the one resident longest.
#[derive(Debug)]
pub(crate) struct RecencyIndex<K> {
    order: BTreeMap<u64, K>,
    stamps: FastMap<K, u64>,
    clock: u64,
}

impl<K: Clone + Eq + Hash> RecencyIndex<K> {
    pub(crate) fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            stamps: FastMap::default(),
            clock: 0,
        }
    }

    /// Marks `key` most recently used, inserting it if absent.
    pub(crate) fn touch(&mut self, key: &K) {
        self.clock += 1;
        if let Some(previous) = self.stamps.insert(key.clone(), self.clock) {
            self.order.remove(&previous);
        }
        self.order.insert(self.clock, key.clone());
    }

    pub(crate) fn remove(&mut self, key: &K) -> bool {
        match self.stamps.remove(key) {
            Some(stamp) => {
                self.order.remove(&stamp);
                true
            }
            None => false,
        }
    }

    /// Least recently used key other than `keep`.
    pub(crate) fn least_recent_except(&self, keep: &K) -> Option<&K> {
        self.order.values().find(|key| *key != keep)
    }

    /// Keys from least to most recently used.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Empties the index, returning keys least recently used first.
    pub(crate) fn drain(&mut self) -> Vec<K> {
        self.stamps.clear();
        std::mem::take(&mut self.order).into_values().collect()
    }
}
