//! NFT metadata documents.
//!
//! Each mint produces two ERC-721 style documents, one per participant. They
//! come from the same builder and differ only in the name ordering and the
//! `Partner` attribute.

use chrono::{DateTime, SecondsFormat, Utc};
use relationnft_core::{format_ether, milestone_definition, Address, Milestone, Relationship, U256};
use serde::{Deserialize, Serialize};

use crate::config::MetadataConfig;

/// ERC-721 metadata JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    /// Token name.
    pub name: String,
    /// Token description.
    pub description: String,
    /// Image URL.
    pub image: String,
    /// Marketplace attributes.
    pub attributes: Vec<Attribute>,
}

impl NftMetadata {
    /// Value of the attribute with `trait_type`, if present.
    pub fn attribute(&self, trait_type: &str) -> Option<&TraitValue> {
        self.attributes
            .iter()
            .find(|attr| attr.trait_type == trait_type)
            .map(|attr| &attr.value)
    }
}

/// One `{trait_type, value}` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub trait_type: String,
    /// Attribute value.
    pub value: TraitValue,
}

/// Attribute value: marketplaces accept strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    /// Numeric value.
    Number(u64),
    /// Text value.
    Text(String),
}

impl Attribute {
    fn text(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: TraitValue::Text(value.into()),
        }
    }

    fn number(trait_type: &str, value: u64) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: TraitValue::Number(value),
        }
    }
}

/// Milestone attribute.
pub const TRAIT_MILESTONE: &str = "Milestone Type";
/// Interaction count attribute.
pub const TRAIT_INTERACTIONS: &str = "Interactions";
/// Tip total attribute.
pub const TRAIT_TIPS: &str = "Tips Exchanged";
/// Partner attribute.
pub const TRAIT_PARTNER: &str = "Partner";
/// Award timestamp attribute.
pub const TRAIT_MINTED_AT: &str = "Minted At";

/// Relationship snapshot embedded in both documents of a mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataInput {
    /// Milestone being awarded.
    pub milestone: Milestone,
    /// First participant as passed to the mint call.
    pub user_a: Address,
    /// Second participant as passed to the mint call.
    pub user_b: Address,
    /// Interaction count at award time.
    pub interaction_count: u64,
    /// Tip total at award time, in wei.
    pub total_tips: U256,
    /// Award timestamp.
    pub minted_at: DateTime<Utc>,
}

impl MetadataInput {
    /// Snapshot `relationship` for a mint between `user_a` and `user_b`.
    pub fn from_relationship(
        milestone: Milestone,
        user_a: Address,
        user_b: Address,
        relationship: &Relationship,
        minted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            milestone,
            user_a,
            user_b,
            interaction_count: relationship.interaction_count,
            total_tips: relationship.total_tips_exchanged,
            minted_at,
        }
    }
}

/// Builder settings shared by every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTemplate {
    image_base_url: String,
    platform: String,
}

impl MetadataTemplate {
    /// Create a template.
    pub fn new(image_base_url: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            image_base_url: image_base_url.into(),
            platform: platform.into(),
        }
    }

    /// Create a template from the `[metadata]` config section.
    pub fn from_config(config: &MetadataConfig) -> Self {
        Self::new(config.image_base_url.clone(), config.platform.clone())
    }

    /// Placeholder image URL for a milestone.
    pub fn image_url(&self, milestone: Milestone) -> String {
        format!(
            "{}/512/{}/ffffff?text={}",
            self.image_base_url.trim_end_matches('/'),
            milestone_definition(milestone).color,
            milestone
        )
    }

    /// Build the document held by `holder`, whose counterpart is `partner`.
    pub fn build(&self, input: &MetadataInput, holder: Address, partner: Address) -> NftMetadata {
        NftMetadata {
            name: format!("{} - {} & {}", input.milestone, holder, partner),
            description: format!(
                "This NFT represents a {} milestone between {} and {} on {}.",
                input.milestone, input.user_a, input.user_b, self.platform
            ),
            image: self.image_url(input.milestone),
            attributes: vec![
                Attribute::text(TRAIT_MILESTONE, input.milestone.as_str()),
                Attribute::number(TRAIT_INTERACTIONS, input.interaction_count),
                Attribute::text(TRAIT_TIPS, format!("{} ETH", format_ether(input.total_tips))),
                Attribute::text(TRAIT_PARTNER, partner.to_string()),
                Attribute::text(
                    TRAIT_MINTED_AT,
                    input.minted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            ],
        }
    }

    /// Build both documents: `user_a`'s first, then `user_b`'s.
    pub fn build_pair(&self, input: &MetadataInput) -> (NftMetadata, NftMetadata) {
        (
            self.build(input, input.user_a, input.user_b),
            self.build(input, input.user_b, input.user_a),
        )
    }
}

impl Default for MetadataTemplate {
    fn default() -> Self {
        Self::from_config(&MetadataConfig::default())
    }
}
