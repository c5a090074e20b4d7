//! Package error provides the cache's one class of fallible, non-expected
//! condition: constructor arguments that can't be satisfied. insert/find/erase
//! stay infallible, per the cache's error handling design -- not-found and
//! duplicate-on-insert are return values, never errors.

use thiserror::Error;

/// Errors returned by [`crate::sharded::ShardedLru::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// `total_capacity` was zero; a cache with no room for any entry is
    /// never useful, so this is rejected rather than silently producing an
    /// always-empty cache.
    #[error("total_capacity must be greater than zero")]
    ZeroTotalCapacity,
}
