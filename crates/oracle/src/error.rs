//! Error types for minting.

use relationnft_core::{CoreError, RelationshipKey};
use thiserror::Error;

/// Failure of a mint attempt.
///
/// None of these are retried internally; callers decide whether a retry is
/// safe. The contract's `hasRelationshipNFT` check is what makes a retry
/// idempotent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    /// The contract reports an NFT for this pair already exists.
    #[error("Relationship NFT already minted for {0}")]
    AlreadyMinted(RelationshipKey),

    /// A metadata document could not be uploaded; the contract was not called.
    #[error("Metadata upload failed: {0}")]
    MetadataUploadFailed(String),

    /// RPC, network or revert failure talking to the contract.
    #[error("Contract call failed: {0}")]
    ContractCallFailed(String),

    /// Milestone identifier not in the milestone table.
    #[error("Invalid milestone: {0}")]
    InvalidMilestone(String),

    /// Mint requested for a pair with no recorded interaction.
    #[error("No relationship found for {0}")]
    MissingRelationship(RelationshipKey),

    /// The relationship store failed.
    #[error("Ledger error: {0}")]
    Ledger(String),
}

impl MintError {
    /// Stable snake_case code for API responses and logs.
    pub const fn code(&self) -> &'static str {
        match self {
            MintError::AlreadyMinted(_) => "already_minted",
            MintError::MetadataUploadFailed(_) => "metadata_upload_failed",
            MintError::ContractCallFailed(_) => "contract_call_failed",
            MintError::InvalidMilestone(_) => "invalid_milestone",
            MintError::MissingRelationship(_) => "missing_relationship",
            MintError::Ledger(_) => "ledger_error",
        }
    }
}

impl From<CoreError> for MintError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownMilestone(id) => MintError::InvalidMilestone(id),
            other => MintError::Ledger(other.to_string()),
        }
    }
}

/// Result type alias for MintError.
pub type Result<T> = std::result::Result<T, MintError>;
