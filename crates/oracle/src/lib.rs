//! Relationship ledger, milestone minting and chain/pinning clients for RelationNFT.
//!
//! This crate provides:
//! - An in-memory relationship ledger with per-pair serialization
//! - The mint orchestrator (metadata build, pin, contract call, award)
//! - The event service used by the HTTP ingress
//! - Alloy and Pinata clients behind the [`chain::ChainClient`] and
//!   [`pinning::MetadataStore`] traits
//!
//! # Event flow
//!
//! ```text
//! webhook event
//!   └─ RelationService::record_event       (holds the pair's event lock)
//!        ├─ Ledger::record_interaction
//!        ├─ relationnft_engine::eligible_milestones
//!        └─ MintOrchestrator::attempt_mint  (per eligible milestone, in table order)
//!             ├─ hasRelationshipNFT guard
//!             ├─ pin both metadata documents
//!             ├─ mintRelationshipNFT (2 x mintFee)
//!             └─ Ledger::award_milestone
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metadata;
pub mod orchestrator;
pub mod pinning;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::MintError;
pub use ledger::Ledger;
pub use orchestrator::{MintOrchestrator, MintReceipt};
pub use service::{EventReport, MilestoneMint, MintStatus, RelationService, UserStats};
