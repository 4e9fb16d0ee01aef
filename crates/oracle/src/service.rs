//! Event processing service.
//!
//! Each inbound event runs `ledger update -> evaluation -> mint attempts`
//! while holding the pair's event lock, so two concurrent events for the same
//! pair cannot both decide the same milestone is newly eligible.

use alloy::primitives::{B256, U256};
use anyhow::Result;
use relationnft_core::{Address, Milestone, Relationship, RelationshipKey};
use relationnft_engine::eligible_milestones;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::MintError;
use crate::ledger::{KeyedLocks, Ledger};
use crate::orchestrator::{MintOrchestrator, MintReceipt};

/// How one eligible milestone was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintStatus {
    /// Minted in this event.
    Minted {
        /// Mint transaction hash.
        tx_hash: B256,
    },
    /// The contract already holds an NFT for the pair.
    AlreadyMinted,
}

/// Result for one milestone processed during an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneMint {
    /// Milestone processed.
    pub milestone: Milestone,
    /// What happened.
    pub status: MintStatus,
}

/// Summary of one processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReport {
    /// Relationship state after the event, including new awards.
    pub relationship: Relationship,
    /// Milestones that were eligible after the ledger update, in table order.
    pub eligible: Vec<Milestone>,
    /// Mint outcomes, in the order they were attempted.
    pub mints: Vec<MilestoneMint>,
}

/// Aggregate statistics for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    /// User address.
    pub address: Address,
    /// Number of relationships the user is part of.
    pub total_relationships: u64,
    /// Sum of interaction counts over those relationships.
    pub total_interactions: u64,
    /// Sum of tip totals over those relationships, in wei.
    pub total_tips: U256,
    /// Relationship NFTs held on-chain.
    pub nft_count: U256,
}

/// Entry point used by the ingress layer.
#[derive(Clone)]
pub struct RelationService {
    ledger: Ledger,
    orchestrator: MintOrchestrator,
    event_locks: Arc<KeyedLocks>,
}

impl RelationService {
    /// Create a service around an orchestrator and its ledger.
    pub fn new(orchestrator: MintOrchestrator) -> Self {
        Self {
            ledger: orchestrator.ledger().clone(),
            orchestrator,
            event_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Record an interaction and mint every newly eligible milestone.
    ///
    /// `AlreadyMinted` outcomes are reported and processing continues; any
    /// other mint failure stops processing and is returned.
    pub async fn record_event(
        &self,
        from: Address,
        to: Address,
        tip: U256,
    ) -> std::result::Result<EventReport, MintError> {
        let key = RelationshipKey::new(from, to);
        let _guard = self.event_locks.lock(key).await;

        let relationship = self
            .ledger
            .record_interaction(from, to, tip)
            .await
            .map_err(|e| MintError::Ledger(format!("{:#}", e)))?;

        let eligible = eligible_milestones(&relationship);
        if !eligible.is_empty() {
            info!(
                "Milestones eligible for {}: {}",
                key,
                eligible
                    .iter()
                    .map(Milestone::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut mints = Vec::with_capacity(eligible.len());
        for milestone in &eligible {
            match self.orchestrator.attempt_mint(from, to, *milestone).await {
                Ok(receipt) => mints.push(MilestoneMint {
                    milestone: *milestone,
                    status: MintStatus::Minted {
                        tx_hash: receipt.tx_hash,
                    },
                }),
                Err(MintError::AlreadyMinted(_)) => mints.push(MilestoneMint {
                    milestone: *milestone,
                    status: MintStatus::AlreadyMinted,
                }),
                Err(e) => {
                    warn!("Stopping milestone processing for {}: {}", key, e);
                    return Err(e);
                }
            }
        }

        let relationship = self
            .ledger
            .get(from, to)
            .await
            .map_err(|e| MintError::Ledger(format!("{:#}", e)))?
            .unwrap_or(relationship);

        Ok(EventReport {
            relationship,
            eligible,
            mints,
        })
    }

    /// Mint `milestone_id` for the pair on request.
    ///
    /// Unknown pairs are rejected before any lock is taken.
    pub async fn mint(
        &self,
        user_a: Address,
        user_b: Address,
        milestone_id: &str,
    ) -> std::result::Result<MintReceipt, MintError> {
        let milestone: Milestone = milestone_id.parse()?;
        let key = RelationshipKey::new(user_a, user_b);
        self.ledger
            .get(user_a, user_b)
            .await
            .map_err(|e| MintError::Ledger(format!("{:#}", e)))?
            .ok_or(MintError::MissingRelationship(key))?;

        let _guard = self.event_locks.lock(key).await;
        self.orchestrator
            .attempt_mint(user_a, user_b, milestone)
            .await
    }

    /// Relationship between two users, if any.
    pub async fn relationship(
        &self,
        user_a: Address,
        user_b: Address,
    ) -> Result<Option<Relationship>> {
        self.ledger.get(user_a, user_b).await
    }

    /// Milestones currently eligible for `relationship`.
    pub fn ready_milestones(&self, relationship: &Relationship) -> Vec<Milestone> {
        eligible_milestones(relationship)
    }

    /// On-chain `hasRelationshipNFT` for the pair.
    pub async fn has_relationship_nft(&self, user_a: Address, user_b: Address) -> Result<bool> {
        self.orchestrator
            .chain()
            .has_relationship_nft(user_a, user_b)
            .await
    }

    /// Aggregate statistics for `user`.
    pub async fn user_stats(&self, user: Address) -> Result<UserStats> {
        let relationships = self.ledger.all_involving(user).await?;

        let total_relationships = relationships.len() as u64;
        let total_interactions = relationships
            .iter()
            .map(|rel| rel.interaction_count)
            .fold(0u64, u64::saturating_add);
        let total_tips = relationships
            .iter()
            .map(|rel| rel.total_tips_exchanged)
            .fold(U256::ZERO, U256::saturating_add);

        let nft_count = self.orchestrator.chain().user_nft_count(user).await?;

        Ok(UserStats {
            address: user,
            total_relationships,
            total_interactions,
            total_tips,
            nft_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataTemplate;
    use crate::test_support::{FakeChain, FakeMetadataStore};
    use relationnft_core::ether;

    struct Harness {
        service: RelationService,
        chain: Arc<FakeChain>,
        store: Arc<FakeMetadataStore>,
    }

    fn harness(chain: FakeChain, store: FakeMetadataStore) -> Harness {
        let chain = Arc::new(chain);
        let store = Arc::new(store);
        let orchestrator = MintOrchestrator::new(
            Ledger::in_memory(),
            chain.clone(),
            store.clone(),
            MetadataTemplate::default(),
        );
        Harness {
            service: RelationService::new(orchestrator),
            chain,
            store,
        }
    }

    fn users() -> (Address, Address) {
        (Address::repeat_byte(0x0c), Address::repeat_byte(0x0d))
    }

    #[tokio::test]
    async fn test_first_supporter_minted_from_single_tip() {
        let h = harness(FakeChain::with_fee(U256::from(10u64)), FakeMetadataStore::new());
        let (a, b) = users();

        let report = h.service.record_event(a, b, ether(1)).await.unwrap();

        assert_eq!(report.eligible, vec![Milestone::FirstSupporter]);
        assert_eq!(report.mints.len(), 1);
        assert_eq!(report.mints[0].milestone, Milestone::FirstSupporter);
        assert!(matches!(report.mints[0].status, MintStatus::Minted { .. }));
        assert_eq!(report.relationship.awarded_milestones, vec![Milestone::FirstSupporter]);

        // Already awarded: the next event evaluates nothing new.
        let report = h.service.record_event(b, a, ether(1)).await.unwrap();
        assert!(report.eligible.is_empty());
        assert!(report.mints.is_empty());
        assert_eq!(h.chain.mint_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fifty_tipless_interactions() {
        let h = harness(FakeChain::with_fee(U256::ZERO), FakeMetadataStore::new());
        let (a, b) = users();

        for _ in 0..49 {
            let report = h.service.record_event(a, b, U256::ZERO).await.unwrap();
            assert!(report.eligible.is_empty());
        }
        let report = h.service.record_event(a, b, U256::ZERO).await.unwrap();
        assert_eq!(report.eligible, vec![Milestone::ConversationPartner]);
        assert_eq!(h.chain.mint_calls()[0].milestone_type, 1);
    }

    #[tokio::test]
    async fn test_simultaneous_milestones_processed_in_table_order() {
        let h = harness(FakeChain::with_fee(U256::ZERO), FakeMetadataStore::new());
        let (a, b) = users();

        for _ in 0..99 {
            h.service
                .ledger()
                .record_interaction(a, b, U256::ZERO)
                .await
                .unwrap();
        }
        let report = h.service.record_event(a, b, ether(50)).await.unwrap();

        assert_eq!(
            report.eligible,
            vec![
                Milestone::FirstSupporter,
                Milestone::ConversationPartner,
                Milestone::GoldenBond,
            ]
        );
        // The contract guard is per pair: only the first attempt mints.
        assert_eq!(
            report.mints,
            vec![
                MilestoneMint {
                    milestone: Milestone::FirstSupporter,
                    status: MintStatus::Minted {
                        tx_hash: B256::with_last_byte(1)
                    },
                },
                MilestoneMint {
                    milestone: Milestone::ConversationPartner,
                    status: MintStatus::AlreadyMinted,
                },
                MilestoneMint {
                    milestone: Milestone::GoldenBond,
                    status: MintStatus::AlreadyMinted,
                },
            ]
        );
        assert_eq!(h.chain.guard_checks(), 3);
        assert_eq!(h.store.uploads().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_propagates_and_records_interaction() {
        let h = harness(FakeChain::with_fee(U256::ZERO), FakeMetadataStore::failing_on(2));
        let (a, b) = users();

        let err = h.service.record_event(a, b, ether(2)).await.unwrap_err();
        assert!(matches!(err, MintError::MetadataUploadFailed(_)));
        assert!(h.chain.mint_calls().is_empty());

        let rel = h.service.relationship(a, b).await.unwrap().unwrap();
        assert_eq!(rel.interaction_count, 1);
        assert!(rel.awarded_milestones.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_mint_once() {
        let h = harness(FakeChain::with_fee(U256::ZERO), FakeMetadataStore::new());
        let (a, b) = users();

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = h.service.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    service.record_event(a, b, ether(1)).await
                } else {
                    service.record_event(b, a, ether(1)).await
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.chain.mint_calls().len(), 1);
        let rel = h.service.relationship(a, b).await.unwrap().unwrap();
        assert_eq!(rel.interaction_count, 16);
        assert_eq!(rel.awarded_milestones, vec![Milestone::FirstSupporter]);
    }

    #[tokio::test]
    async fn test_manual_mint_parses_milestone() {
        let h = harness(FakeChain::with_fee(U256::ZERO), FakeMetadataStore::new());
        let (a, b) = users();

        let err = h.service.mint(a, b, "BEST_FRIENDS").await.unwrap_err();
        assert_eq!(err, MintError::InvalidMilestone("BEST_FRIENDS".to_string()));

        let err = h.service.mint(a, b, "CO_CREATOR").await.unwrap_err();
        assert!(matches!(err, MintError::MissingRelationship(_)));
        assert_eq!(h.service.event_locks.len().await, 0);
        assert_eq!(h.chain.guard_checks(), 0);

        h.service.ledger().record_interaction(a, b, U256::ZERO).await.unwrap();
        let receipt = h.service.mint(a, b, "CO_CREATOR").await.unwrap();
        assert_eq!(receipt.milestone, Milestone::CoCreator);
        assert_eq!(h.chain.mint_calls()[0].milestone_type, 2);
    }

    #[tokio::test]
    async fn test_user_stats() {
        let h = harness(FakeChain::with_fee(U256::ZERO), FakeMetadataStore::new());
        let (a, b) = users();
        let c = Address::repeat_byte(0x0e);

        h.service.record_event(a, b, ether(1)).await.unwrap();
        h.service.record_event(c, a, U256::from(5u64)).await.unwrap();
        h.service.record_event(c, a, U256::ZERO).await.unwrap();

        let stats = h.service.user_stats(a).await.unwrap();
        assert_eq!(stats.total_relationships, 2);
        assert_eq!(stats.total_interactions, 3);
        assert_eq!(stats.total_tips, ether(1) + U256::from(5u64));
        assert_eq!(stats.nft_count, U256::from(1u64));
    }

    #[tokio::test]
    async fn test_chain_read_failures_surface() {
        let h = harness(FakeChain::with_fee(U256::ZERO).offline(), FakeMetadataStore::new());
        let (a, b) = users();

        assert!(h.service.has_relationship_nft(a, b).await.is_err());
        assert!(h.service.user_stats(a).await.is_err());

        let err = h.service.record_event(a, b, ether(1)).await.unwrap_err();
        assert!(matches!(err, MintError::ContractCallFailed(_)));
    }
}
