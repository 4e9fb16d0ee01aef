//! Relationship store backends.

use anyhow::Result;
use async_trait::async_trait;
use relationnft_core::{Address, Relationship, RelationshipKey};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keyed storage for relationship records.
///
/// Implementations only need last-write-wins `upsert`; read-modify-write
/// serialization per key is handled by [`super::Ledger`].
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Fetch the record for a pair.
    async fn get(&self, key: &RelationshipKey) -> Result<Option<Relationship>>;

    /// Insert or replace the record stored under `relationship.key()`.
    async fn upsert(&self, relationship: Relationship) -> Result<()>;

    /// All records where `user` is one of the participants.
    async fn involving(&self, user: &Address) -> Result<Vec<Relationship>>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}

/// Process-local store. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RelationshipKey, Relationship>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored relationships.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn get(&self, key: &RelationshipKey) -> Result<Option<Relationship>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn upsert(&self, relationship: Relationship) -> Result<()> {
        let key = relationship.key();
        self.records.write().await.insert(key, relationship);
        Ok(())
    }

    async fn involving(&self, user: &Address) -> Result<Vec<Relationship>> {
        let records = self.records.read().await;
        let mut matches: Vec<Relationship> = records
            .iter()
            .filter(|(key, _)| key.involves(user))
            .map(|(_, rel)| rel.clone())
            .collect();
        // HashMap iteration order is arbitrary; keep output stable.
        matches.sort_by_key(|rel| rel.key());
        Ok(matches)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_upsert_replaces_record() {
        let store = MemoryStore::new();
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);

        let mut rel = Relationship::new(a, b, Utc::now());
        store.upsert(rel.clone()).await.unwrap();
        rel.interaction_count = 3;
        store.upsert(rel.clone()).await.unwrap();

        assert_eq!(store.len().await, 1);
        let stored = store.get(&RelationshipKey::new(b, a)).await.unwrap().unwrap();
        assert_eq!(stored.interaction_count, 3);
    }

    #[tokio::test]
    async fn test_involving_filters_and_sorts() {
        let store = MemoryStore::new();
        let me = Address::repeat_byte(0x05);
        let now = Utc::now();

        store
            .upsert(Relationship::new(me, Address::repeat_byte(0x09), now))
            .await
            .unwrap();
        store
            .upsert(Relationship::new(Address::repeat_byte(0x01), me, now))
            .await
            .unwrap();
        store
            .upsert(Relationship::new(
                Address::repeat_byte(0x01),
                Address::repeat_byte(0x09),
                now,
            ))
            .await
            .unwrap();

        let mine = store.involving(&me).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|rel| rel.involves(&me)));
        assert!(mine[0].key() < mine[1].key());
    }
}
