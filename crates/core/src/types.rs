//! Core types for RelationNFT.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Relationship milestone identifiers.
///
/// Variant order is the contract enum order (see [`crate::constants::MILESTONES`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Milestone {
    /// First tip of at least 1 ETH between the pair.
    FirstSupporter,
    /// Fifty interactions.
    ConversationPartner,
    /// Collaboration milestone (manual only).
    CoCreator,
    /// At least 100 ETH tipped.
    MutualWhale,
    /// One hundred interactions and 50 ETH tipped.
    GoldenBond,
    /// Referral milestone (manual only).
    CommunityBuilder,
    /// Early user milestone (manual only).
    EarlyAdopter,
}

impl Milestone {
    /// All milestones in contract enum order.
    pub const ALL: [Milestone; 7] = [
        Milestone::FirstSupporter,
        Milestone::ConversationPartner,
        Milestone::CoCreator,
        Milestone::MutualWhale,
        Milestone::GoldenBond,
        Milestone::CommunityBuilder,
        Milestone::EarlyAdopter,
    ];

    /// Canonical identifier string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Milestone::FirstSupporter => "FIRST_SUPPORTER",
            Milestone::ConversationPartner => "CONVERSATION_PARTNER",
            Milestone::CoCreator => "CO_CREATOR",
            Milestone::MutualWhale => "MUTUAL_WHALE",
            Milestone::GoldenBond => "GOLDEN_BOND",
            Milestone::CommunityBuilder => "COMMUNITY_BUILDER",
            Milestone::EarlyAdopter => "EARLY_ADOPTER",
        }
    }

    /// `uint8` value expected by the contract's `milestoneType` parameter.
    pub const fn contract_enum(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Milestone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Milestone::ALL
            .into_iter()
            .find(|m| m.as_str() == trimmed)
            .ok_or_else(|| CoreError::UnknownMilestone(trimmed.to_string()))
    }
}

/// Canonical unordered pair of users.
///
/// `RelationshipKey::new(a, b) == RelationshipKey::new(b, a)` for all `a`, `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipKey {
    low: Address,
    high: Address,
}

impl RelationshipKey {
    /// Build the key by sorting the two addresses bytewise.
    pub fn new(a: Address, b: Address) -> Self {
        if a <= b {
            RelationshipKey { low: a, high: b }
        } else {
            RelationshipKey { low: b, high: a }
        }
    }

    /// The lower address of the pair.
    pub const fn low(&self) -> Address {
        self.low
    }

    /// The higher address of the pair.
    pub const fn high(&self) -> Address {
        self.high
    }

    /// Whether `user` is one side of this pair.
    pub fn involves(&self, user: &Address) -> bool {
        self.low == *user || self.high == *user
    }
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{}-0x{}",
            hex::encode(self.low.as_slice()),
            hex::encode(self.high.as_slice())
        )
    }
}

/// Accumulated interaction state for one pair of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Participants, in the order first observed.
    pub users: [Address; 2],
    /// Number of recorded interactions.
    pub interaction_count: u64,
    /// Sum of all tips, in wei.
    pub total_tips_exchanged: U256,
    /// Time of the first recorded interaction.
    pub first_interaction: DateTime<Utc>,
    /// Time of the latest recorded interaction.
    pub last_interaction: DateTime<Utc>,
    /// Milestones already minted for this pair (append-only).
    pub awarded_milestones: Vec<Milestone>,
}

impl Relationship {
    /// Create an empty relationship first observed at `now`.
    pub fn new(first: Address, second: Address, now: DateTime<Utc>) -> Self {
        Relationship {
            users: [first, second],
            interaction_count: 0,
            total_tips_exchanged: U256::ZERO,
            first_interaction: now,
            last_interaction: now,
            awarded_milestones: Vec::new(),
        }
    }

    /// Canonical key of this relationship.
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey::new(self.users[0], self.users[1])
    }

    /// Apply one interaction carrying `tip` wei.
    pub fn record(&mut self, tip: U256, now: DateTime<Utc>) {
        self.interaction_count = self.interaction_count.saturating_add(1);
        self.total_tips_exchanged = self.total_tips_exchanged.saturating_add(tip);
        self.last_interaction = now;
    }

    /// Whether the milestone has already been awarded.
    pub fn has_milestone(&self, milestone: Milestone) -> bool {
        self.awarded_milestones.contains(&milestone)
    }

    /// Append a milestone award. Returns `false` if it was already present.
    pub fn award(&mut self, milestone: Milestone) -> bool {
        if self.has_milestone(milestone) {
            return false;
        }
        self.awarded_milestones.push(milestone);
        true
    }

    /// Whether `user` participates in this relationship.
    pub fn involves(&self, user: &Address) -> bool {
        self.users.contains(user)
    }

    /// The other participant, if `user` participates.
    pub fn partner_of(&self, user: &Address) -> Option<Address> {
        match self.users {
            [a, b] if a == *user => Some(b),
            [a, b] if b == *user => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_key_is_unordered() {
        let pairs = [(0x01, 0x02), (0xff, 0x00), (0x10, 0x10), (0x7a, 0x3b)];
        for (a, b) in pairs {
            assert_eq!(
                RelationshipKey::new(addr(a), addr(b)),
                RelationshipKey::new(addr(b), addr(a))
            );
        }
    }

    #[test]
    fn test_key_display_sorted_lowercase() {
        let key = RelationshipKey::new(addr(0xbb), addr(0xaa));
        assert_eq!(
            key.to_string(),
            format!("0x{}-0x{}", "aa".repeat(20), "bb".repeat(20))
        );
        assert_eq!(key.low(), addr(0xaa));
        assert_eq!(key.high(), addr(0xbb));
    }

    #[test]
    fn test_milestone_parse() {
        for milestone in Milestone::ALL {
            assert_eq!(milestone.as_str().parse::<Milestone>().unwrap(), milestone);
        }
        assert_eq!(
            "FIRST_SUPPORTER ".parse::<Milestone>().unwrap(),
            Milestone::FirstSupporter
        );
        assert!(matches!(
            "first_supporter".parse::<Milestone>(),
            Err(CoreError::UnknownMilestone(_))
        ));
    }

    #[test]
    fn test_milestone_serde_matches_as_str() {
        for milestone in Milestone::ALL {
            let json = serde_json::to_string(&milestone).unwrap();
            assert_eq!(json, format!("\"{}\"", milestone.as_str()));
        }
    }

    #[test]
    fn test_contract_enum_values() {
        assert_eq!(Milestone::FirstSupporter.contract_enum(), 0);
        assert_eq!(Milestone::GoldenBond.contract_enum(), 4);
        assert_eq!(Milestone::EarlyAdopter.contract_enum(), 6);
    }

    #[test]
    fn test_relationship_record_and_award() {
        let now = Utc::now();
        let mut rel = Relationship::new(addr(2), addr(1), now);
        assert_eq!(rel.key(), RelationshipKey::new(addr(1), addr(2)));

        rel.record(U256::from(5u64), now);
        rel.record(U256::from(7u64), now);
        assert_eq!(rel.interaction_count, 2);
        assert_eq!(rel.total_tips_exchanged, U256::from(12u64));

        assert!(rel.award(Milestone::FirstSupporter));
        assert!(!rel.award(Milestone::FirstSupporter));
        assert_eq!(rel.awarded_milestones, vec![Milestone::FirstSupporter]);
    }

    #[test]
    fn test_partner_of() {
        let rel = Relationship::new(addr(1), addr(2), Utc::now());
        assert_eq!(rel.partner_of(&addr(1)), Some(addr(2)));
        assert_eq!(rel.partner_of(&addr(2)), Some(addr(1)));
        assert_eq!(rel.partner_of(&addr(3)), None);
    }
}
