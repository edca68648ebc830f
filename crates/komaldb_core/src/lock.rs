//! Per-key mutual exclusion.
//!
//! Every key maps to one of a fixed number of shards by hash. Holding a shard
//! guard gives exclusive access to every key that hashes to it, so two
//! operations on the same key never overlap while operations on keys in
//! different shards run in parallel. Memory use does not grow with the number
//! of distinct keys ever touched.

use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

/// Guard for a single key's shard. Released on drop.
pub type KeyGuard<'a> = MutexGuard<'a, ()>;

/// Fixed-size table of per-key locks.
#[derive(Debug)]
pub struct LockTable {
    shards: Box<[Mutex<()>]>,
    hasher: RandomState,
}

impl LockTable {
    /// Creates a lock table with `shards` shards (at least one).
    #[must_use]
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    /// Returns the number of shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the shard index `key` maps to.
    #[must_use]
    pub fn shard_of(&self, key: &str) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        let hash = self.hasher.hash_one(key) as usize;
        hash % self.shards.len()
    }

    /// Blocks until the guard for `key` is available and returns it.
    ///
    /// Guards are not reentrant: acquiring the same key twice on one thread
    /// deadlocks.
    pub fn lock(&self, key: &str) -> KeyGuard<'_> {
        self.shards[self.shard_of(key)].lock()
    }

    /// Acquires the guard for `key` if no one else holds it.
    pub fn try_lock(&self, key: &str) -> Option<KeyGuard<'_>> {
        self.shards[self.shard_of(key)].try_lock()
    }

    /// Acquires every shard in index order.
    ///
    /// Single-key operations only ever hold one shard, so the fixed order
    /// cannot deadlock against them.
    pub fn lock_all(&self) -> Vec<KeyGuard<'_>> {
        self.shards.iter().map(|shard| shard.lock()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn same_key_same_shard() {
        let table = LockTable::new(16);
        assert_eq!(table.shard_of("user:1"), table.shard_of("user:1"));
        assert!(table.shard_of("user:1") < 16);
    }

    #[test]
    fn zero_shards_clamped() {
        let table = LockTable::new(0);
        assert_eq!(table.shard_count(), 1);
    }

    #[test]
    fn held_key_cannot_be_taken() {
        let table = LockTable::new(4);
        let guard = table.lock("k");
        assert!(table.try_lock("k").is_none());
        drop(guard);
        assert!(table.try_lock("k").is_some());
    }

    #[test]
    fn lock_all_blocks_every_key() {
        let table = LockTable::new(4);
        let guards = table.lock_all();
        assert_eq!(guards.len(), 4);
        assert!(table.try_lock("anything").is_none());
        drop(guards);
        assert!(table.try_lock("anything").is_some());
    }

    #[test]
    fn guard_serializes_critical_section() {
        let table = Arc::new(LockTable::new(8));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = table.lock("shared");
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
