//! Package handle provides `ConstAccessor`, a scoped read pin on a cached
//! value. The name mirrors Intel TBB's `concurrent_hash_map::const_accessor`,
//! the accessor type this cache's design is grounded on.

use std::sync::Arc;

/// A scoped pin on a value returned from [`crate::shard::LruShard::find`] or
/// [`crate::sharded::ShardedLru::find`]. While bound, the referenced value is
/// immutable and guaranteed to stay alive even if the cache concurrently
/// evicts the node it came from.
#[derive(Default)]
pub struct ConstAccessor<V> {
    value: Option<Arc<V>>,
}

impl<V> ConstAccessor<V> {
    /// Creates an empty accessor, ready to be passed to `find`.
    pub fn new() -> Self {
        Self { value: None }
    }

    /// Binds this accessor to `value`, implicitly releasing any prior pin.
    pub(crate) fn bind(&mut self, value: Arc<V>) {
        self.value = Some(value);
    }

    /// Drops the pin. Idempotent.
    pub fn release(&mut self) {
        self.value = None;
    }

    /// True iff this accessor holds no pin.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Dereferences the pinned value.
    ///
    /// # Panics
    /// Panics if the accessor is empty -- dereferencing an unbound handle is
    /// a programmer error, not an expected runtime condition.
    pub fn get(&self) -> &V {
        self.value
            .as_deref()
            .expect("ConstAccessor::get called on an empty accessor")
    }
}

impl<V> std::ops::Deref for ConstAccessor<V> {
    type Target = V;

    fn deref(&self) -> &V {
        self.get()
    }
}
