//! In-process mutual exclusion for read-modify-write sequences on one
//! device schedule.
//!
//! Locks are always taken in the order `Device` then `Schedule`, and never
//! across two devices.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    Device(i32),
    Schedule(i32),
}

#[derive(Debug, Default)]
pub struct ScheduleLocks {
    slots: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl ScheduleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `key` is free and holds it until the guard is dropped.
    pub async fn lock(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Forget slots nobody holds or waits on.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(ScheduleLocks::new());
        let guard = locks.lock(LockKey::Schedule(1)).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(LockKey::Schedule(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = ScheduleLocks::new();
        let _device = locks.lock(LockKey::Device(1)).await;
        let _schedule = locks.lock(LockKey::Schedule(1)).await;
        let other = tokio::time::timeout(Duration::from_millis(100), locks.lock(LockKey::Device(2)));
        assert!(other.await.is_ok());
    }
}
