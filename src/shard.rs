//! Package shard implements the single-shard concurrent LRU engine:
//! a `DashMap` hash index (fine-grained, per-bucket locking) over a
//! fixed-size arena recency list guarded by a short-held list lock, with
//! value storage in an `ArcSwapOption` so promotion and overwrite never
//! tear a concurrent read.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::handle::ConstAccessor;
use crate::key::KeyBuildHasher;
use crate::list::ListCore;

/// A single shard's concurrent LRU: strict capacity, strict recency order,
/// safe for any number of concurrent readers and writers.
pub struct LruShard<K, V> {
    capacity: usize,
    index: DashMap<K, usize, KeyBuildHasher>,
    values: Box<[ArcSwapOption<V>]>,
    list: Mutex<ListCore<K>>,
    len: AtomicUsize,
}

impl<K, V> LruShard<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Creates a shard with the given strict capacity. `bucket_hint` sizes
    /// the hash index's initial internal shard count (rounded up to the
    /// next power of two, as `DashMap` requires).
    pub fn new(capacity: usize, bucket_hint: usize) -> Self {
        assert!(capacity >= 1, "LruShard capacity must be at least 1");
        // One extra usable slot beyond capacity: insert() links the new node
        // before evicting the over-capacity tail, so the arena must have
        // room for `capacity + 1` live nodes transiently.
        let total = capacity + 3;
        let mut values = Vec::with_capacity(total);
        values.resize_with(total, ArcSwapOption::empty);
        let shard = Self {
            capacity,
            index: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                KeyBuildHasher::default(),
                bucket_hint.max(1).next_power_of_two(),
            ),
            values: values.into_boxed_slice(),
            list: Mutex::new(ListCore::new(capacity)),
            len: AtomicUsize::new(0),
        };
        trace!(capacity, "constructed LruShard");
        shard
    }

    /// Inserts or overwrites `key`, promoting it to MRU either way.
    /// Returns `true` if this created a new Live entry, `false` if it
    /// overwrote one that was already present.
    pub fn insert(&self, key: K, value: V) -> bool {
        let value = Arc::new(value);
        let lookup_key = key.clone();
        match self.index.entry(lookup_key) {
            MapEntry::Occupied(entry) => {
                let idx = *entry.get();
                // A single atomic pointer store: concurrent finds see the
                // old value or this one, never a torn mix of the two.
                self.values[idx].store(Some(value));
                self.list.lock().move_to_front(idx);
                trace!(shard_len = self.size(), "insert overwrote existing key");
                false
            }
            MapEntry::Vacant(entry) => {
                let (idx, evicted) = {
                    let mut list = self.list.lock();
                    let idx = list.insert_new(key);
                    let evicted = if list.len() > self.capacity {
                        list.evict_tail()
                    } else {
                        None
                    };
                    (idx, evicted)
                };
                // Publish the value before the key becomes visible in the
                // index, so a racing find() never observes the new slot
                // with a still-empty value.
                self.values[idx].store(Some(value));
                entry.insert(idx);
                self.len.fetch_add(1, Ordering::Relaxed);

                if let Some((evicted_idx, evicted_key)) = evicted {
                    self.values[evicted_idx].store(None);
                    self.index.remove(&evicted_key);
                    self.len.fetch_sub(1, Ordering::Relaxed);
                    trace!("evicted LRU tail entry to respect capacity");
                }
                true
            }
        }
    }

    /// Binds `handle` to `key`'s value and promotes it to MRU, returning
    /// `true`. Returns `false` and releases `handle` if `key` is absent.
    pub fn find(&self, handle: &mut ConstAccessor<V>, key: &K) -> bool {
        let Some(idx_guard) = self.index.get(key) else {
            handle.release();
            return false;
        };
        let idx = *idx_guard;
        // Hold the index guard across the value read: it keeps this key's
        // slot from being evicted and recycled for an unrelated key while
        // we're mid-read (the guard blocks concurrent erase/insert on the
        // same key, and a slot can only be reused after such a removal).
        let value = self.values[idx].load_full();
        drop(idx_guard);

        let Some(value) = value else {
            // Can't happen given the publish-before-index-insert ordering
            // in `insert`, but fail safe rather than panic on a read path.
            handle.release();
            return false;
        };
        handle.bind(value);

        let mut list = self.list.lock();
        if list.key_at(idx) == Some(key) {
            list.move_to_front(idx);
        }
        true
    }

    /// Removes `key`. Returns 1 if it was present, 0 otherwise.
    pub fn erase(&self, key: &K) -> usize {
        let Some((_, idx)) = self.index.remove(key) else {
            return 0;
        };
        self.values[idx].store(None);
        self.list.lock().remove(idx);
        self.len.fetch_sub(1, Ordering::Relaxed);
        1
    }

    /// Removes every entry. Handles obtained before this call keep
    /// observing their pinned values regardless.
    pub fn clear(&self) {
        self.index.clear();
        let mut list = self.list.lock();
        for slot in self.values.iter() {
            slot.store(None);
        }
        list.clear();
        self.len.store(0, Ordering::Relaxed);
        trace!("cleared shard");
    }

    /// Current number of Live entries. May be observed stale relative to
    /// concurrent operations, but is monotonic within a quiescent period.
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// The shard's configured, constant capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
