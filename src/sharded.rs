//! Package sharded provides `ShardedLru`, the multi-shard router that owns
//! N independent [`crate::shard::LruShard`] instances and dispatches every
//! operation to exactly one of them by the upper bits of the key's hash.

use std::hash::Hash;

use tracing::{debug, warn};

use crate::error::CacheError;
use crate::handle::ConstAccessor;
use crate::key::hash_key;
use crate::shard::LruShard;

/// A sharded, thread-safe, bounded LRU cache.
///
/// Splits `total_capacity` across `shard_count` independent [`LruShard`]s
/// and routes each key to exactly one shard for its entire lifetime.
/// Provides strict total capacity and per-shard (not global) recency order.
pub struct ShardedLru<K, V> {
    shards: Box<[LruShard<K, V>]>,
}

impl<K, V> ShardedLru<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Builds a cache of `total_capacity` entries spread over `shard_count`
    /// shards. `shard_count == 0` resolves to the host's hardware
    /// parallelism (floored at 1). Any remainder from dividing capacity
    /// evenly is added to shard 0.
    ///
    /// # Errors
    /// Returns [`CacheError::ZeroTotalCapacity`] if `total_capacity == 0`.
    pub fn new(total_capacity: usize, shard_count: usize) -> Result<Self, CacheError> {
        if total_capacity == 0 {
            return Err(CacheError::ZeroTotalCapacity);
        }

        let hardware_parallelism = num_cpus::get().max(1);
        let mut shard_count = if shard_count == 0 {
            hardware_parallelism
        } else {
            shard_count
        };

        if shard_count > total_capacity {
            warn!(
                requested = shard_count,
                total_capacity, "clamping shard_count down to total_capacity"
            );
            shard_count = total_capacity;
        }

        let bucket_hint = Self::bucket_hint(shard_count, hardware_parallelism);
        let base = total_capacity / shard_count;
        let remainder = total_capacity % shard_count;

        let mut shards = Vec::with_capacity(shard_count);
        for i in 0..shard_count {
            let capacity = if i == 0 { base + remainder } else { base };
            shards.push(LruShard::new(capacity, bucket_hint));
        }

        debug!(
            total_capacity,
            shard_count, bucket_hint, "constructed ShardedLru"
        );

        Ok(Self {
            shards: shards.into_boxed_slice(),
        })
    }

    /// `4 << log2_ratio`, `log2_ratio = ceil(log2(shard_count / hardware_parallelism).max(0))`,
    /// clamped to a floor of 4 -- sidesteps the undefined negative-log case
    /// when `shard_count < hardware_parallelism`.
    fn bucket_hint(shard_count: usize, hardware_parallelism: usize) -> usize {
        let ratio = shard_count as f64 / hardware_parallelism as f64;
        let log2_ratio = ratio.log2().max(0.0).ceil() as u32;
        (4usize << log2_ratio).max(4)
    }

    fn shard_for(&self, key: &K) -> &LruShard<K, V> {
        let idx = (hash_key(key) >> 48) as usize % self.shards.len();
        &self.shards[idx]
    }

    /// Inserts or overwrites `key`, routed to its shard. See
    /// [`LruShard::insert`] for the return value's meaning.
    pub fn insert(&self, key: K, value: V) -> bool {
        self.shard_for(&key).insert(key, value)
    }

    /// Finds `key`, binding `handle` on a hit. See [`LruShard::find`].
    pub fn find(&self, handle: &mut ConstAccessor<V>, key: &K) -> bool {
        self.shard_for(key).find(handle, key)
    }

    /// Removes `key`. Returns 1 if present, 0 otherwise.
    pub fn erase(&self, key: &K) -> usize {
        self.shard_for(key).erase(key)
    }

    /// Clears every shard.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }

    /// Total number of Live entries across all shards.
    pub fn size(&self) -> usize {
        self.shards.iter().map(LruShard::size).sum()
    }

    /// Number of Live entries in shard `idx`, or 0 if `idx` is out of range.
    pub fn size_of(&self, idx: usize) -> usize {
        self.shards.get(idx).map_or(0, LruShard::size)
    }

    /// Total configured capacity across all shards.
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(LruShard::capacity).sum()
    }

    /// Configured capacity of shard `idx`, or 0 if `idx` is out of range.
    pub fn capacity_of(&self, idx: usize) -> usize {
        self.shards.get(idx).map_or(0, LruShard::capacity)
    }

    /// Number of shards this cache was built with.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheAddr;

    #[test]
    fn zero_total_capacity_is_rejected() {
        let result: Result<ShardedLru<u32, u32>, _> = ShardedLru::new(0, 4);
        assert_eq!(result.unwrap_err(), CacheError::ZeroTotalCapacity);
    }

    #[test]
    fn shard_count_zero_resolves_to_hardware_parallelism() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(64, 0).unwrap();
        assert_eq!(cache.shard_count(), num_cpus::get().max(1).min(64));
    }

    #[test]
    fn excess_shard_count_is_clamped_to_total_capacity() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(3, 100).unwrap();
        assert_eq!(cache.shard_count(), 3);
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn remainder_capacity_goes_to_shard_zero() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(10, 3).unwrap();
        assert_eq!(cache.capacity_of(0), 4);
        assert_eq!(cache.capacity_of(1), 3);
        assert_eq!(cache.capacity_of(2), 3);
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn key_always_routes_to_the_same_shard() {
        let cache: ShardedLru<CacheAddr, u32> = ShardedLru::new(16, 4).unwrap();
        let key = CacheAddr::v4([10, 0, 0, 7]);
        cache.insert(key, 1);
        let first = cache
            .shards
            .iter()
            .position(|s| s.size() == 1)
            .expect("key must have landed in exactly one shard");

        cache.erase(&key);
        cache.insert(key, 2);
        let second = cache
            .shards
            .iter()
            .position(|s| s.size() == 1)
            .expect("key must still route consistently");

        assert_eq!(first, second);
    }

    #[test]
    fn fill_and_evict_across_shards() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(8, 2).unwrap();
        for k in 0..64u32 {
            cache.insert(k, k);
        }
        assert_eq!(cache.size(), 8);
        assert!(cache.size() <= cache.capacity());
    }

    #[test]
    fn find_promotes_within_its_shard() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(1, 1).unwrap();
        cache.insert(1, 10);
        let mut acc = ConstAccessor::new();
        assert!(cache.find(&mut acc, &1));
        assert_eq!(*acc.get(), 10);
        cache.insert(2, 20);
        assert!(!cache.find(&mut ConstAccessor::new(), &1));
        assert!(cache.find(&mut acc, &2));
    }

    #[test]
    fn clear_empties_every_shard() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(8, 4).unwrap();
        for k in 0..8u32 {
            cache.insert(k, k);
        }
        cache.clear();
        assert_eq!(cache.size(), 0);
        for idx in 0..cache.shard_count() {
            assert_eq!(cache.size_of(idx), 0);
        }
    }

    #[test]
    fn handle_survives_eviction_across_a_large_sharded_workload() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(64, 8).unwrap();
        for k in 0..64u32 {
            cache.insert(k, k);
        }
        let mut acc = ConstAccessor::new();
        assert!(cache.find(&mut acc, &0));
        let pinned = *acc.get();

        for k in 64..2_000u32 {
            cache.insert(k, k);
        }

        assert_eq!(*acc.get(), pinned);
        assert_eq!(cache.size(), cache.capacity());
    }
}
