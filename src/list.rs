//! Package list provides the per-shard recency list: a doubly linked list
//! with sentinel head/tail nodes, modeled as indices into a fixed-size arena
//! rather than owning pointers, so there are no `Rc`/`Arc` ownership cycles
//! to break on unlink.
//!
//! The arena is sized `capacity + 3` once at shard construction and never
//! grows: two sentinel slots, plus `capacity + 1` usable slots so a new node
//! can be linked in before the over-capacity tail is evicted.

const HEAD: usize = 0;
const TAIL: usize = 1;

/// The structural half of a shard's recency list: which slot holds which
/// key, and how slots are linked. Value storage lives separately in the
/// shard's `values` array so it can be read without this lock.
pub(crate) struct ListCore<K> {
    keys: Vec<Option<K>>,
    prev: Vec<usize>,
    next: Vec<usize>,
    free: Vec<usize>,
    live: usize,
}

impl<K> ListCore<K> {
    pub(crate) fn new(capacity: usize) -> Self {
        let total = capacity + 3;
        let mut keys = Vec::with_capacity(total);
        keys.resize_with(total, || None);
        let mut prev = vec![0usize; total];
        let mut next = vec![0usize; total];
        prev[HEAD] = HEAD;
        next[HEAD] = TAIL;
        prev[TAIL] = HEAD;
        next[TAIL] = TAIL;
        let free: Vec<usize> = (2..total).rev().collect();
        Self { keys, prev, next, free, live: 0 }
    }

    fn push_front(&mut self, idx: usize) {
        let first = self.next[HEAD];
        self.next[HEAD] = idx;
        self.prev[idx] = HEAD;
        self.next[idx] = first;
        self.prev[first] = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let p = self.prev[idx];
        let n = self.next[idx];
        self.next[p] = n;
        self.prev[n] = p;
    }

    /// Allocates a fresh slot for `key`, links it at MRU, and accounts for
    /// it in the live count. Panics if the arena has no free slots, which
    /// would mean the capacity invariant was already violated by the caller.
    pub(crate) fn insert_new(&mut self, key: K) -> usize {
        let idx = self
            .free
            .pop()
            .expect("LruShard arena exhausted: capacity invariant was violated");
        self.keys[idx] = Some(key);
        self.push_front(idx);
        self.live += 1;
        idx
    }

    /// Moves an already-linked slot to MRU. A no-op if it's already there.
    pub(crate) fn move_to_front(&mut self, idx: usize) {
        if self.next[HEAD] == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    /// Returns the key occupying `idx`, or `None` for a free/sentinel slot.
    pub(crate) fn key_at(&self, idx: usize) -> Option<&K> {
        self.keys[idx].as_ref()
    }

    /// Unlinks and frees an arbitrary live slot (used by `erase`).
    pub(crate) fn remove(&mut self, idx: usize) {
        self.unlink(idx);
        self.keys[idx] = None;
        self.free.push(idx);
        self.live -= 1;
    }

    /// Evicts the current tail (LRU) entry, if any.
    pub(crate) fn evict_tail(&mut self) -> Option<(usize, K)> {
        let idx = self.prev[TAIL];
        if idx == HEAD {
            return None;
        }
        let key = self.keys[idx].take().expect("tail slot missing its key");
        self.unlink(idx);
        self.free.push(idx);
        self.live -= 1;
        Some((idx, key))
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn clear(&mut self) {
        let total = self.keys.len();
        self.prev[HEAD] = HEAD;
        self.next[HEAD] = TAIL;
        self.prev[TAIL] = HEAD;
        self.next[TAIL] = TAIL;
        for key in self.keys.iter_mut() {
            *key = None;
        }
        self.free = (2..total).rev().collect();
        self.live = 0;
    }
}
