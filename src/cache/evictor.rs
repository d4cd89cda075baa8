//! Eviction policy: bounds the number of retained entries.
//!
//! Eviction is insertion-order FIFO, not access-order: the oldest keys in the
//! store's sequence go first. A zero or absent capacity disables the bound.

use tracing::info;

use crate::cache::entry::Identification;
use crate::cache::store::CacheStore;

/// Default number of entries a provider retains.
pub const DEFAULT_CAPACITY: usize = 10;

/// The eviction policy engine.
#[derive(Debug, Clone, Copy)]
pub struct Evictor {
    max: Option<usize>,
}

impl Default for Evictor {
    fn default() -> Self {
        Self::new(Some(DEFAULT_CAPACITY))
    }
}

impl Evictor {
    pub fn new(max: Option<usize>) -> Self {
        Self { max }
    }

    /// Effective capacity. `None` and `Some(0)` both mean unbounded.
    // NOTE: zero is treated the same as "no bound"; changing that needs a product call.
    pub fn capacity(&self) -> Option<usize> {
        self.max.filter(|&max| max > 0)
    }

    /// Evict the oldest entries beyond capacity. Returns them oldest first.
    pub fn enforce<C>(&self, store: &mut CacheStore<C>) -> Vec<Identification> {
        let Some(capacity) = self.capacity() else {
            return Vec::new();
        };

        let evicted = store.evict_overflow(capacity);
        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                capacity,
                remaining = store.len(),
                "Eviction round complete"
            );
        }
        evicted
    }
}
