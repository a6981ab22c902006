//! Per-instance mutual exclusion.
//!
//! Reconciliation of one instance must never run twice at the same time:
//! the scheduled pass skips an instance that is busy, while user-triggered
//! syncs wait for their turn.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowwatch_core::types::DbId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held while an instance is being reconciled.
pub type InstanceGuard = OwnedMutexGuard<()>;

#[derive(Clone, Default)]
pub struct InstanceLocks {
    slots: Arc<Mutex<HashMap<DbId, Arc<AsyncMutex<()>>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, instance_id: DbId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(instance_id).or_default().clone()
    }

    /// Take the lock if nobody holds it.
    pub fn try_acquire(&self, instance_id: DbId) -> Option<InstanceGuard> {
        self.slot(instance_id).try_lock_owned().ok()
    }

    /// Wait until the lock is free.
    pub async fn acquire(&self, instance_id: DbId) -> InstanceGuard {
        self.slot(instance_id).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn busy_instance_cannot_be_taken_twice() {
        let locks = InstanceLocks::new();
        let guard = locks.try_acquire(1).expect("first acquire");
        assert!(locks.try_acquire(1).is_none());
        assert!(locks.try_acquire(2).is_some());

        drop(guard);
        assert!(locks.try_acquire(1).is_some());
    }

    #[tokio::test]
    async fn acquire_waits_for_release() {
        let locks = InstanceLocks::new();
        let guard = locks.acquire(7).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(7).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }
}
