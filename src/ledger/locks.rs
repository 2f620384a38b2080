use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table handing out one async mutex per key.
///
/// Slots are never evicted; keys are `(admin, fuel type)` pairs so the table
/// stays small.
pub struct KeyedLocks<K> {
    slots: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash> KeyedLocks<K> {
    pub fn new() -> Self {
        KeyedLocks { slots: DashMap::new() }
    }

    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        // The shard guard is released before awaiting the slot.
        let slot = self.slots.entry(key).or_default().clone();
        slot.lock_owned().await
    }
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
