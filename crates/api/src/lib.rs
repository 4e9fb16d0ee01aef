//! Axum-based webhook and query API for RelationNFT.
//!
//! This crate provides:
//! - `POST /api/farcaster/webhook` - record a tip or interaction and mint unlocked milestones
//! - `GET /api/relationship/:user1/:user2` - relationship state plus on-chain NFT status
//! - `POST /api/mint` - mint a named milestone for an existing relationship
//! - `GET /api/user/:address/stats` - per-user aggregates
//! - `GET /api/milestones` and `GET /api/health`

#![warn(missing_docs)]

/// API server runtime and in-process app builder.
pub mod server;
