//! Per-relationship mutual exclusion.

use relationnft_core::RelationshipKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A table of async mutexes, one per relationship key.
///
/// Entries are created on first use and kept for the process lifetime, the
/// same lifetime as the relationships they guard.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<RelationshipKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting for any current holder.
    pub async fn lock(&self, key: RelationshipKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relationnft_core::Address;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let key = RelationshipKey::new(Address::repeat_byte(1), Address::repeat_byte(2));

        let guard = locks.lock(key).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let first = RelationshipKey::new(Address::repeat_byte(1), Address::repeat_byte(2));
        let second = RelationshipKey::new(Address::repeat_byte(3), Address::repeat_byte(4));

        let _guard = locks.lock(first).await;
        tokio::time::timeout(Duration::from_secs(1), locks.lock(second))
            .await
            .unwrap();
        assert_eq!(locks.len().await, 2);
    }
}
