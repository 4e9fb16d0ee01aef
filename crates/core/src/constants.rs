//! Canonical constants for RelationNFT.
//!
//! The milestone table order MUST match the `MilestoneType` enum of the
//! deployed RelationNFT contract: a milestone's position is its enum value.

use alloy_primitives::U256;

use crate::types::Milestone;

/// Wei in one ether (10^18).
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Number of decimals used when rendering wei amounts as ether.
pub const ETHER_DECIMALS: u8 = 18;

/// Threshold predicate for a milestone.
///
/// Both conditions must hold (`>=` comparisons). A zero bound is trivially
/// satisfied, which is how single-condition milestones are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    /// Minimum number of recorded interactions.
    pub min_interactions: u64,
    /// Minimum tip total, in whole ether.
    pub min_tips_ether: u64,
}

impl Threshold {
    /// Minimum tip total in wei.
    pub fn min_tips_wei(&self) -> U256 {
        U256::from(self.min_tips_ether) * U256::from(WEI_PER_ETHER)
    }
}

/// Static definition of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneDefinition {
    /// Milestone identifier.
    pub id: Milestone,
    /// Unlock predicate. `None` means never eligible automatically.
    pub threshold: Option<Threshold>,
    /// Hex colour (no `#`) used for the placeholder NFT image.
    pub color: &'static str,
}

/// Ordered milestone table.
///
/// Entries without a threshold are only minted through the manual mint
/// operation.
pub const MILESTONES: [MilestoneDefinition; 7] = [
    MilestoneDefinition {
        id: Milestone::FirstSupporter,
        threshold: Some(Threshold {
            min_interactions: 0,
            min_tips_ether: 1,
        }),
        color: "ffbe0b",
    },
    MilestoneDefinition {
        id: Milestone::ConversationPartner,
        threshold: Some(Threshold {
            min_interactions: 50,
            min_tips_ether: 0,
        }),
        color: "8338ec",
    },
    MilestoneDefinition {
        id: Milestone::CoCreator,
        threshold: None,
        color: "3a86ff",
    },
    MilestoneDefinition {
        id: Milestone::MutualWhale,
        threshold: Some(Threshold {
            min_interactions: 0,
            min_tips_ether: 100,
        }),
        color: "fb5607",
    },
    MilestoneDefinition {
        id: Milestone::GoldenBond,
        threshold: Some(Threshold {
            min_interactions: 100,
            min_tips_ether: 50,
        }),
        color: "ffd60a",
    },
    MilestoneDefinition {
        id: Milestone::CommunityBuilder,
        threshold: None,
        color: "000000",
    },
    MilestoneDefinition {
        id: Milestone::EarlyAdopter,
        threshold: None,
        color: "000000",
    },
];

/// Look up the table entry for a milestone.
pub fn milestone_definition(milestone: Milestone) -> &'static MilestoneDefinition {
    // Every variant has exactly one entry, in enum order.
    &MILESTONES[milestone.contract_enum() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for (index, def) in MILESTONES.iter().enumerate() {
            assert_eq!(def.id.contract_enum() as usize, index);
            assert_eq!(milestone_definition(def.id).id, def.id);
        }
    }

    #[test]
    fn test_golden_bond_requires_both_conditions() {
        let threshold = milestone_definition(Milestone::GoldenBond)
            .threshold
            .unwrap();
        assert_eq!(threshold.min_interactions, 100);
        assert_eq!(threshold.min_tips_ether, 50);
    }

    #[test]
    fn test_predicate_less_milestones() {
        for id in [
            Milestone::CoCreator,
            Milestone::CommunityBuilder,
            Milestone::EarlyAdopter,
        ] {
            assert!(milestone_definition(id).threshold.is_none());
        }
    }
}
