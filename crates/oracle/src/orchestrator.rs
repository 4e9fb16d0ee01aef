//! Mint orchestration.
//!
//! Drives one `(pair, milestone)` mint through its steps:
//! 1. `hasRelationshipNFT` guard on the contract (authoritative)
//! 2. build both metadata documents
//! 3. upload both documents; any failure aborts before the contract call
//! 4. resolve the milestone's contract enum
//! 5. `mintRelationshipNFT` paying twice the quoted fee
//! 6. record the award in the ledger

use alloy::primitives::{B256, U256};
use chrono::Utc;
use relationnft_core::{Address, Milestone, Relationship, RelationshipKey};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::{ChainClient, MintCall};
use crate::error::{MintError, Result};
use crate::ledger::Ledger;
use crate::metadata::{MetadataInput, MetadataTemplate};
use crate::pinning::MetadataStore;

/// Outcome of a successful mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    /// Milestone that was minted.
    pub milestone: Milestone,
    /// Mint transaction hash.
    pub tx_hash: B256,
    /// Metadata URIs for `user_a` and `user_b`, in call order.
    pub metadata_uris: [String; 2],
    /// Value sent with the transaction.
    pub fee_paid: U256,
    /// Relationship after the award was recorded.
    pub relationship: Relationship,
}

/// Coordinates metadata upload, the contract call and the ledger award.
#[derive(Clone)]
pub struct MintOrchestrator {
    ledger: Ledger,
    chain: Arc<dyn ChainClient>,
    metadata_store: Arc<dyn MetadataStore>,
    template: MetadataTemplate,
}

impl MintOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        ledger: Ledger,
        chain: Arc<dyn ChainClient>,
        metadata_store: Arc<dyn MetadataStore>,
        template: MetadataTemplate,
    ) -> Self {
        Self {
            ledger,
            chain,
            metadata_store,
            template,
        }
    }

    /// The ledger awards are recorded in.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The chain client used for minting.
    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// Attempt to mint `milestone` for the pair `(user_a, user_b)`.
    ///
    /// The caller is expected to hold the pair's event lock.
    pub async fn attempt_mint(
        &self,
        user_a: Address,
        user_b: Address,
        milestone: Milestone,
    ) -> Result<MintReceipt> {
        let key = RelationshipKey::new(user_a, user_b);
        info!("Minting {} for {} and {}", milestone, user_a, user_b);

        let relationship = self
            .ledger
            .get(user_a, user_b)
            .await
            .map_err(|e| MintError::Ledger(format!("{:#}", e)))?
            .ok_or(MintError::MissingRelationship(key))?;

        let already_minted = self
            .chain
            .has_relationship_nft(user_a, user_b)
            .await
            .map_err(|e| MintError::ContractCallFailed(format!("{:#}", e)))?;
        if already_minted {
            info!("Skipping {} for {}: NFT already minted on-chain", milestone, key);
            return Err(MintError::AlreadyMinted(key));
        }

        let input =
            MetadataInput::from_relationship(milestone, user_a, user_b, &relationship, Utc::now());
        let (metadata_a, metadata_b) = self.template.build_pair(&input);

        let uri_a = self.upload(&metadata_a).await?;
        let uri_b = self.upload(&metadata_b).await?;

        let fee = self
            .chain
            .mint_fee()
            .await
            .map_err(|e| MintError::ContractCallFailed(format!("{:#}", e)))?;
        let fee_paid = fee.saturating_mul(U256::from(2u64));

        let call = MintCall {
            user1: user_a,
            user2: user_b,
            milestone_type: milestone.contract_enum(),
            interaction_count: input.interaction_count,
            total_tips: input.total_tips,
            metadata_uri1: uri_a.clone(),
            metadata_uri2: uri_b.clone(),
            fee_paid,
        };

        let tx_hash = self.chain.mint_relationship_nft(&call).await.map_err(|e| {
            warn!("Mint of {} for {} failed: {:#}", milestone, key, e);
            MintError::ContractCallFailed(format!("{:#}", e))
        })?;

        let relationship = self
            .ledger
            .award_milestone(user_a, user_b, milestone)
            .await
            .map_err(|e| MintError::Ledger(format!("{:#}", e)))?
            .ok_or(MintError::MissingRelationship(key))?;

        info!(
            "Minted {} for {} (tx: 0x{}, fee paid: {})",
            milestone,
            key,
            hex::encode(tx_hash),
            fee_paid
        );

        Ok(MintReceipt {
            milestone,
            tx_hash,
            metadata_uris: [uri_a, uri_b],
            fee_paid,
            relationship,
        })
    }

    async fn upload(&self, metadata: &crate::metadata::NftMetadata) -> Result<String> {
        self.metadata_store.upload(metadata).await.map_err(|e| {
            warn!("Metadata upload for '{}' failed: {:#}", metadata.name, e);
            MintError::MetadataUploadFailed(format!("{:#}", e))
        })
    }
}
