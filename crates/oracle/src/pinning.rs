//! Content-addressed metadata storage.
//!
//! Pins NFT metadata JSON to IPFS through the Pinata `pinJSONToIPFS` API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::PinningConfig;
use crate::metadata::NftMetadata;

/// Upload target for metadata documents.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Upload one JSON document and return its URI.
    async fn upload(&self, metadata: &NftMetadata) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pinata-backed [`MetadataStore`].
#[derive(Clone)]
pub struct PinataClient {
    client: Client,
    api_url: String,
    api_key: String,
    secret_api_key: String,
}

impl PinataClient {
    /// Build a client with explicit settings.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        secret_api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("relationnft-oracle/pinning")
            .build()
            .context("Failed to build pinning HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            secret_api_key: secret_api_key.into(),
        })
    }

    /// Build a client from the `[pinning]` config section.
    pub fn from_config(config: &PinningConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.secret_api_key.clone(),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl MetadataStore for PinataClient {
    async fn upload(&self, metadata: &NftMetadata) -> Result<String> {
        debug!("Pinning metadata '{}'", metadata.name);

        let response = self
            .client
            .post(&self.api_url)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_api_key)
            .json(metadata)
            .send()
            .await
            .context("Failed to send pin request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Pin request failed with status {}: {}", status, body);
        }

        let pinned: PinResponse = response
            .json()
            .await
            .context("Invalid pin response JSON")?;

        if pinned.ipfs_hash.trim().is_empty() {
            anyhow::bail!("Pin response contained an empty IpfsHash");
        }

        let uri = format!("ipfs://{}", pinned.ipfs_hash.trim());
        info!("Pinned metadata '{}' to {}", metadata.name, uri);
        Ok(uri)
    }
}
