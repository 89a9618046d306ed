use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

// ============================================================================
// Per-order locks
// ============================================================================
//
// Every read-then-publish or read-then-write sequence on one order runs
// under that order's lock, whoever runs it (lifecycle service, redelivery
// actor). Holding it across the publish keeps the queue in the same order
// as the store. Entries are pruned once nobody holds or waits on them.
//
// ============================================================================

#[derive(Default)]
pub struct OrderLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held lock on one order id. Released on drop.
pub struct OrderLockGuard {
    registry: Arc<OrderLocks>,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl OrderLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn lock(self: &Arc<Self>, id: &str) -> OrderLockGuard {
        let lock = self
            .locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        OrderLockGuard {
            registry: self.clone(),
            id: id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Ids currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        // Owned guard holds one reference; drop it before counting
        self.guard.take();
        self.registry
            .locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
