// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, insertion-ordered map with FIFO eviction.
//!
//! Backs the Activity Monitor's pending-ref table, the Request Handler's
//! recent-reference de-dup set, and the Supervisor's per-recorder
//! `results` cache.

use indexmap::IndexMap;
use std::hash::Hash;

/// A map that evicts its oldest entry once `size_limit` is exceeded.
#[derive(Debug, Clone)]
pub struct BoundedMap<K, V> {
    inner: IndexMap<K, V>,
    size_limit: usize,
}

impl<K: Hash + Eq, V> BoundedMap<K, V> {
    pub fn new(size_limit: usize) -> Self {
        assert!(size_limit > 0, "size_limit must be positive");
        Self {
            inner: IndexMap::new(),
            size_limit,
        }
    }

    /// Insert a key/value pair, evicting the oldest entry if the map is at
    /// capacity. Re-inserting an existing key updates its value but does
    /// not refresh its position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let replaced = self.inner.insert(key, value);
        if replaced.is_none() && self.inner.len() > self.size_limit {
            self.inner.shift_remove_index(0);
        }
        replaced
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.shift_remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }
}
