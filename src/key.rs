//! Package key provides the cache's socket-address key type.
//!
//! `CacheAddr` is a tagged IPv4/IPv6 address: a discriminator plus either a
//! 32-bit v4 address or a 16-byte v6 address. Equality compares the
//! discriminator first, then the in-use address bytes. Its `Hash` impl
//! funnels through [`KeyHasher`], the same mix64/combine routine
//! [`crate::sharded::ShardedLru`] uses to route keys to shards, so a
//! `DashMap<CacheAddr, _, BuildHasherDefault<KeyHasher>>` buckets on the
//! identical hash.

use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::hash::{combine, mix64};

/// A tagged IPv4/IPv6 address used as the default cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheAddr {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl CacheAddr {
    pub const fn v4(octets: [u8; 4]) -> Self {
        CacheAddr::V4(octets)
    }

    pub const fn v6(octets: [u8; 16]) -> Self {
        CacheAddr::V6(octets)
    }

    fn family(&self) -> u8 {
        match self {
            CacheAddr::V4(_) => 4,
            CacheAddr::V6(_) => 6,
        }
    }

    /// Computes this key's canonical hash directly, without going through
    /// the `Hash`/`Hasher` machinery. [`crate::sharded::ShardedLru`] calls
    /// this for routing; `KeyHasher` below reproduces the identical value
    /// for `DashMap`'s internal bucketing.
    pub fn canonical_hash(&self) -> u64 {
        let mut seed = mix64(self.family() as u64);
        match self {
            CacheAddr::V4(octets) => {
                let word = u32::from_ne_bytes(*octets) as u64;
                seed = combine(seed, mix64(word));
            }
            CacheAddr::V6(octets) => {
                for chunk in octets.chunks_exact(8) {
                    let word = u64::from_ne_bytes(chunk.try_into().unwrap());
                    seed = combine(seed, mix64(word));
                }
            }
        }
        seed
    }
}

impl From<Ipv4Addr> for CacheAddr {
    fn from(addr: Ipv4Addr) -> Self {
        CacheAddr::V4(addr.octets())
    }
}

impl From<Ipv6Addr> for CacheAddr {
    fn from(addr: Ipv6Addr) -> Self {
        CacheAddr::V6(addr.octets())
    }
}

impl Hash for CacheAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.canonical_hash());
    }
}

/// A [`Hasher`] whose `finish()` reproduces [`CacheAddr::canonical_hash`]
/// exactly, used as `DashMap`'s `BuildHasher` so the hash index's internal
/// bucketing and the shard router agree on the same low-bit avalanche.
#[derive(Default)]
pub struct KeyHasher(u64);

impl Hasher for KeyHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        // CacheAddr::hash always funnels through write_u64, so this path is
        // only reached for key types other than CacheAddr; fall back to
        // combining whatever words we're handed so KeyBuildHasher remains a
        // usable general-purpose BuildHasher.
        for chunk in bytes.chunks(8) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.0 = combine(mix64(self.0), u64::from_ne_bytes(buf));
        }
    }

    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }
}

/// `BuildHasher` pairing for [`KeyHasher`].
pub type KeyBuildHasher = BuildHasherDefault<KeyHasher>;

/// Hashes any `Hash` key through [`KeyHasher`] -- the same function used as
/// `DashMap`'s `BuildHasher`, so a caller-supplied key type (not just
/// `CacheAddr`) still has shard routing and intra-shard bucketing agree.
pub fn hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = KeyHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}
