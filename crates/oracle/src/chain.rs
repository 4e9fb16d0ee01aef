//! RelationNFT contract client.
//!
//! Wraps the three contract methods the oracle needs (`hasRelationshipNFT`,
//! `mintFee`, `mintRelationshipNFT`) plus the `userNFTCount` read used for
//! statistics.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

/// Arguments of a `mintRelationshipNFT` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    /// First participant.
    pub user1: Address,
    /// Second participant.
    pub user2: Address,
    /// Milestone enum value.
    pub milestone_type: u8,
    /// Interaction count at mint time.
    pub interaction_count: u64,
    /// Tip total at mint time, in wei.
    pub total_tips: U256,
    /// Metadata URI for `user1`'s token.
    pub metadata_uri1: String,
    /// Metadata URI for `user2`'s token.
    pub metadata_uri2: String,
    /// Value sent with the transaction (one fee per token).
    pub fee_paid: U256,
}

/// On-chain side of minting.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Whether the pair already holds a relationship NFT.
    async fn has_relationship_nft(&self, user1: Address, user2: Address) -> Result<bool>;

    /// Per-token mint fee quoted by the contract.
    async fn mint_fee(&self) -> Result<U256>;

    /// Send the mint transaction and wait for a successful receipt.
    ///
    /// Returns the transaction hash. A reverted receipt is an error.
    async fn mint_relationship_nft(&self, call: &MintCall) -> Result<B256>;

    /// Number of relationship NFTs held by `user`.
    async fn user_nft_count(&self, user: Address) -> Result<U256>;
}

// Type alias for the Alloy provider with wallet support
type WalletProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::fillers::JoinFill<
            alloy::providers::Identity,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::GasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::BlobGasFiller,
                    alloy::providers::fillers::JoinFill<
                        alloy::providers::fillers::NonceFiller,
                        alloy::providers::fillers::ChainIdFiller,
                    >,
                >,
            >,
        >,
        alloy::providers::fillers::WalletFiller<EthereumWallet>,
    >,
    alloy::providers::RootProvider<alloy::transports::http::Http<alloy::transports::http::Client>>,
    alloy::transports::http::Http<alloy::transports::http::Client>,
    alloy::network::Ethereum,
>;

// Generate RelationNFT contract bindings
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract RelationNFT {
        function mintRelationshipNFT(
            address user1,
            address user2,
            uint8 milestoneType,
            uint256 interactionCount,
            uint256 totalTipsExchanged,
            string metadataURI1,
            string metadataURI2
        ) external payable;
        function hasRelationshipNFT(address user1, address user2) external view returns (bool);
        function mintFee() external view returns (uint256);
        function userNFTCount(address user) external view returns (uint256);
    }
}

/// [`ChainClient`] backed by an Alloy HTTP provider and a local signer.
pub struct AlloyChainClient {
    contract: RelationNFT::RelationNFTInstance<
        alloy::transports::http::Http<alloy::transports::http::Client>,
        WalletProvider,
    >,
    oracle_address: Address,
}

impl AlloyChainClient {
    /// Connect to `rpc_url`, signing with `signer`.
    pub fn new(rpc_url: &str, signer: PrivateKeySigner, contract_address: Address) -> Result<Self> {
        let oracle_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        let contract = RelationNFT::new(contract_address, provider);

        Ok(Self {
            contract,
            oracle_address,
        })
    }

    /// Connect using a hex private key (with or without `0x`).
    pub fn from_private_key(
        rpc_url: &str,
        private_key: &str,
        contract_address: Address,
    ) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("Failed to parse oracle private key")?;
        Self::new(rpc_url, signer, contract_address)
    }

    /// Address of the oracle wallet that sends mint transactions.
    pub fn oracle_address(&self) -> Address {
        self.oracle_address
    }

    /// Address of the RelationNFT contract.
    pub fn contract_address(&self) -> Address {
        *self.contract.address()
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn has_relationship_nft(&self, user1: Address, user2: Address) -> Result<bool> {
        let result = self
            .contract
            .hasRelationshipNFT(user1, user2)
            .call()
            .await
            .context("Failed to call hasRelationshipNFT")?;
        Ok(result._0)
    }

    async fn mint_fee(&self) -> Result<U256> {
        let result = self
            .contract
            .mintFee()
            .call()
            .await
            .context("Failed to call mintFee")?;
        Ok(result._0)
    }

    async fn mint_relationship_nft(&self, call: &MintCall) -> Result<B256> {
        let tx = self
            .contract
            .mintRelationshipNFT(
                call.user1,
                call.user2,
                call.milestone_type,
                U256::from(call.interaction_count),
                call.total_tips,
                call.metadata_uri1.clone(),
                call.metadata_uri2.clone(),
            )
            .value(call.fee_paid)
            .send()
            .await
            .context("Failed to send mintRelationshipNFT transaction")?;

        info!("Transaction sent: 0x{}", hex::encode(tx.tx_hash()));

        let receipt = tx
            .get_receipt()
            .await
            .context("Failed to get transaction receipt")?;

        // Receipt status must be checked before the award is recorded locally.
        if !receipt.status() {
            warn!(
                "Transaction reverted: 0x{} in block {} (gas used: {})",
                hex::encode(receipt.transaction_hash),
                receipt.block_number.unwrap_or_default(),
                receipt.gas_used
            );
            anyhow::bail!(
                "Transaction reverted: 0x{} - mintRelationshipNFT({}, {}, {}) failed on-chain",
                hex::encode(receipt.transaction_hash),
                call.user1,
                call.user2,
                call.milestone_type
            );
        }

        info!(
            "Mint confirmed: 0x{} in block {}",
            hex::encode(receipt.transaction_hash),
            receipt.block_number.unwrap_or_default()
        );

        Ok(receipt.transaction_hash)
    }

    async fn user_nft_count(&self, user: Address) -> Result<U256> {
        let result = self
            .contract
            .userNFTCount(user)
            .call()
            .await
            .context("Failed to call userNFTCount")?;
        Ok(result._0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first default account.
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_from_private_key_derives_oracle_address() {
        let client = AlloyChainClient::from_private_key(
            "http://localhost:8545",
            TEST_KEY,
            Address::repeat_byte(0x42),
        )
        .unwrap();

        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(client.oracle_address(), expected);
        assert_eq!(client.contract_address(), Address::repeat_byte(0x42));
    }

    #[test]
    fn test_rejects_invalid_key_and_url() {
        assert!(AlloyChainClient::from_private_key(
            "http://localhost:8545",
            "not-a-key",
            Address::repeat_byte(0x42)
        )
        .is_err());

        assert!(AlloyChainClient::from_private_key(
            "not a url",
            TEST_KEY,
            Address::repeat_byte(0x42)
        )
        .is_err());
    }
}
