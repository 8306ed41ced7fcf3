//! Modulo-hash, bucket-locked map container.
//!
//! Each bucket is its own `parking_lot::Mutex`, so lookups/inserts on
//! different buckets never contend (section 3: "Map (modulo hash, optionally
//! bucket-locked)"). `PdSpace` uses one of these as its DB GUID table.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

use super::{CountFlags, Locator, Position, SchedulerObject, SchedulerObjectKind};
use crate::error::{SchedulerError, SchedulerResult};

const DEFAULT_BUCKETS: usize = 64;

pub struct Map<K, V> {
    buckets: Vec<Mutex<Vec<(K, V)>>>,
}

impl<K: Hash + Eq + Clone, V> Map<K, V> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(n: usize) -> Self {
        let mut buckets = Vec::with_capacity(n);
        for _ in 0..n {
            buckets.push(Mutex::new(Vec::new()));
        }
        Self { buckets }
    }

    fn bucket_index(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.buckets.len()
    }

    pub fn put(&self, key: K, value: V) {
        let idx = self.bucket_index(&key);
        let mut bucket = self.buckets[idx].lock();
        if let Some(slot) = bucket.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            bucket.push((key, value));
        }
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let idx = self.bucket_index(key);
        let bucket = self.buckets[idx].lock();
        bucket.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    /// Run `f` with mutable access to the stored value, without cloning it
    /// out from under the bucket lock. Used to take the per-DB lock that
    /// section 5 describes (the PdSpace map-insert lock is this map's own
    /// bucket lock; the value's internal spin-lock is whatever `V` wraps).
    pub fn with_mut<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let idx = self.bucket_index(key);
        let mut bucket = self.buckets[idx].lock();
        bucket.iter_mut().find(|(k, _)| k == key).map(|(_, v)| f(v))
    }

    pub fn remove_key(&self, key: &K) -> Option<V> {
        let idx = self.bucket_index(key);
        let mut bucket = self.buckets[idx].lock();
        let pos = bucket.iter().position(|(k, _)| k == key)?;
        Some(bucket.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `key` if absent, constructing the value with `make`; returns
    /// whether the key was newly inserted. Mirrors the common
    /// "find-or-create the DbSpace" pattern the ST heuristic needs for
    /// `db-at-scheduler`/`db-move-dst`.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> bool
    where
        V: Clone,
    {
        let idx = self.bucket_index(&key);
        let mut bucket = self.buckets[idx].lock();
        if bucket.iter().any(|(k, _)| *k == key) {
            false
        } else {
            bucket.push((key, make()));
            true
        }
    }
}

impl<K: Hash + Eq + Clone, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> SchedulerObject for Map<K, V> {
    type Item = (K, V);

    fn kind(&self) -> SchedulerObjectKind {
        SchedulerObjectKind::Map
    }

    fn insert(&mut self, _position: Position, item: (K, V)) -> SchedulerResult<()> {
        self.put(item.0, item.1);
        Ok(())
    }

    fn remove(&mut self, position: Position) -> SchedulerResult<Option<(K, V)>> {
        match position.locator {
            Locator::Iterator(_) => Err(SchedulerError::NotSupported(
                "Map removal is by key, not position".into(),
            )),
            _ => Err(SchedulerError::NotSupported(
                "use remove_key for Map".into(),
            )),
        }
    }

    fn count(&self, _flags: CountFlags) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove_round_trip() {
        let map: Map<u64, &str> = Map::new();
        map.put(1, "a");
        map.put(2, "b");
        assert_eq!(map.get_cloned(&1), Some("a"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.remove_key(&1), Some("a"));
        assert_eq!(map.get_cloned(&1), None);
    }

    #[test]
    fn get_or_insert_with_only_constructs_once() {
        let map: Map<u64, u32> = Map::new();
        let mut calls = 0;
        map.get_or_insert_with(1, || {
            calls += 1;
            10
        });
        map.get_or_insert_with(1, || {
            calls += 1;
            20
        });
        assert_eq!(calls, 1);
        assert_eq!(map.get_cloned(&1), Some(10));
    }
}
