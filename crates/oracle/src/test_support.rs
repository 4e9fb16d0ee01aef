//! In-process fakes for the chain and pinning collaborators.
//!
//! Compiled for unit tests and for dependents enabling the `test-support`
//! feature.

use alloy::primitives::{B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use relationnft_core::{Address, RelationshipKey};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::chain::{ChainClient, MintCall};
use crate::metadata::NftMetadata;
use crate::pinning::MetadataStore;

/// Chain fake that remembers minted pairs like the real contract.
#[derive(Debug, Default)]
pub struct FakeChain {
    fee: U256,
    revert: bool,
    offline: bool,
    minted: Mutex<HashSet<RelationshipKey>>,
    calls: Mutex<Vec<MintCall>>,
    guard_checks: AtomicUsize,
    fee_reads: AtomicUsize,
}

impl FakeChain {
    /// Fake quoting `fee` per token.
    pub fn with_fee(fee: U256) -> Self {
        Self {
            fee,
            ..Self::default()
        }
    }

    /// Every mint transaction reverts.
    pub fn reverting(mut self) -> Self {
        self.revert = true;
        self
    }

    /// Every read fails as if the RPC endpoint were unreachable.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Pretend the pair already holds an NFT.
    pub fn mark_minted(&self, a: Address, b: Address) {
        self.minted.lock().unwrap().insert(RelationshipKey::new(a, b));
    }

    /// Mint calls received, in order.
    pub fn mint_calls(&self) -> Vec<MintCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `hasRelationshipNFT` reads.
    pub fn guard_checks(&self) -> usize {
        self.guard_checks.load(Ordering::SeqCst)
    }

    /// Number of `mintFee` reads.
    pub fn fee_reads(&self) -> usize {
        self.fee_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn has_relationship_nft(&self, user1: Address, user2: Address) -> Result<bool> {
        self.guard_checks.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            anyhow::bail!("connection refused");
        }
        // A real RPC read suspends here; let other tasks run before answering.
        tokio::task::yield_now().await;
        Ok(self
            .minted
            .lock()
            .unwrap()
            .contains(&RelationshipKey::new(user1, user2)))
    }

    async fn mint_fee(&self) -> Result<U256> {
        self.fee_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.fee)
    }

    async fn mint_relationship_nft(&self, call: &MintCall) -> Result<B256> {
        if self.revert {
            anyhow::bail!("execution reverted");
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(call.clone());
        self.minted
            .lock()
            .unwrap()
            .insert(RelationshipKey::new(call.user1, call.user2));
        Ok(B256::with_last_byte(calls.len() as u8))
    }

    async fn user_nft_count(&self, user: Address) -> Result<U256> {
        if self.offline {
            anyhow::bail!("connection refused");
        }
        let minted = self.minted.lock().unwrap();
        let count = minted.iter().filter(|key| key.involves(&user)).count();
        Ok(U256::from(count))
    }
}

/// Pinning fake returning `ipfs://doc-<n>` for the n-th upload attempt.
#[derive(Debug, Default)]
pub struct FakeMetadataStore {
    fail_on: Option<usize>,
    attempts: AtomicUsize,
    uploads: Mutex<Vec<NftMetadata>>,
}

impl FakeMetadataStore {
    /// Fake that accepts every upload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `attempt`-th upload (1-based).
    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Self::default()
        }
    }

    /// Successfully uploaded documents, in order.
    pub fn uploads(&self) -> Vec<NftMetadata> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn upload(&self, metadata: &NftMetadata) -> Result<String> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(attempt) {
            anyhow::bail!("pinning service unavailable");
        }
        self.uploads.lock().unwrap().push(metadata.clone());
        Ok(format!("ipfs://doc-{}", attempt))
    }
}
