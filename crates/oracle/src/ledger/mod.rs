//! Relationship ledger.
//!
//! This module provides:
//! - Lazy creation of relationship records on first interaction
//! - Monotonic interaction / tip counters per unordered pair
//! - Append-only milestone award markers
//!
//! Every read-modify-write of a single pair runs under that pair's lock, so
//! concurrent events for the same pair never lose an increment.

use anyhow::Result;
use chrono::Utc;
use relationnft_core::{Address, Milestone, Relationship, RelationshipKey, U256};
use std::sync::Arc;
use tracing::debug;

pub mod locks;
pub mod store;

pub use locks::KeyedLocks;
pub use store::{MemoryStore, RelationshipStore};

/// Interaction ledger backed by a [`RelationshipStore`].
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn RelationshipStore>,
    locks: Arc<KeyedLocks>,
}

impl Ledger {
    /// Create a ledger over an explicit store.
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self {
            store,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Create a ledger over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Record one interaction between `user_a` and `user_b` carrying `tip` wei.
    ///
    /// Creates the relationship if absent and returns the updated record.
    pub async fn record_interaction(
        &self,
        user_a: Address,
        user_b: Address,
        tip: U256,
    ) -> Result<Relationship> {
        let key = RelationshipKey::new(user_a, user_b);
        let _guard = self.locks.lock(key).await;

        let now = Utc::now();
        let mut relationship = match self.store.get(&key).await? {
            Some(existing) => existing,
            None => {
                debug!("Creating relationship {}", key);
                Relationship::new(user_a, user_b, now)
            }
        };

        relationship.record(tip, now);
        self.store.upsert(relationship.clone()).await?;

        debug!(
            "Recorded interaction {} (count={}, tips={})",
            key, relationship.interaction_count, relationship.total_tips_exchanged
        );

        Ok(relationship)
    }

    /// Get the relationship between two users, if any.
    pub async fn get(&self, user_a: Address, user_b: Address) -> Result<Option<Relationship>> {
        self.store.get(&RelationshipKey::new(user_a, user_b)).await
    }

    /// All relationships that include `user`.
    pub async fn all_involving(&self, user: Address) -> Result<Vec<Relationship>> {
        self.store.involving(&user).await
    }

    /// Mark `milestone` as awarded for the pair.
    ///
    /// Returns the updated record, or `None` if the pair has no relationship.
    /// Awarding twice is a no-op.
    pub async fn award_milestone(
        &self,
        user_a: Address,
        user_b: Address,
        milestone: Milestone,
    ) -> Result<Option<Relationship>> {
        let key = RelationshipKey::new(user_a, user_b);
        let _guard = self.locks.lock(key).await;

        let Some(mut relationship) = self.store.get(&key).await? else {
            return Ok(None);
        };

        if relationship.award(milestone) {
            self.store.upsert(relationship.clone()).await?;
        }

        Ok(Some(relationship))
    }

    /// Name of the underlying store backend.
    pub fn backend_type(&self) -> &'static str {
        self.store.backend_type()
    }
}
