//! # RelationNFT Core
//!
//! Core types, the milestone table, and ether unit helpers for RelationNFT.
//!
//! This crate provides the building blocks shared by the evaluator, the mint
//! oracle and the HTTP ingress, keeping the milestone enum numbering in one
//! place so it matches the on-chain contract.
//!
//! ## Features
//!
//! - **Ethereum Types**: Uses Alloy primitives for Address and U256
//! - **Domain Types**: Milestone, RelationshipKey, Relationship
//! - **Constants**: Ordered milestone table with unlock thresholds
//! - **Units**: Wei <-> decimal ether and address parsing at the edges

#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod types;
pub mod units;

// Re-export commonly used items
pub use constants::*;
pub use error::{CoreError, Result};
pub use types::*;
pub use units::{ether, format_ether, parse_address, parse_ether};

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, B256, U256};
