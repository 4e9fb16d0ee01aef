//! RelationNFT milestone evaluator.
//!
//! This crate implements the deterministic unlock rule:
//! - A milestone already awarded to the pair is never eligible again
//! - A milestone without a threshold is never eligible
//! - Otherwise it is eligible when `interactions >= min_interactions && tips >= min_tips`
//! - Results follow the milestone table's declaration order

use relationnft_core::constants::{MilestoneDefinition, Threshold, MILESTONES};
use relationnft_core::types::{Milestone, Relationship};
use relationnft_core::U256;

/// Whether raw counters satisfy a threshold.
pub fn meets_threshold(threshold: &Threshold, interaction_count: u64, total_tips: U256) -> bool {
    interaction_count >= threshold.min_interactions && total_tips >= threshold.min_tips_wei()
}

/// Whether `definition` is newly unlocked for `relationship`.
pub fn is_unlocked(definition: &MilestoneDefinition, relationship: &Relationship) -> bool {
    if relationship.has_milestone(definition.id) {
        return false;
    }
    match &definition.threshold {
        Some(threshold) => meets_threshold(
            threshold,
            relationship.interaction_count,
            relationship.total_tips_exchanged,
        ),
        None => false,
    }
}

/// Evaluate an explicit milestone table against a relationship.
///
/// Output order is the order of `table`.
pub fn eligible_from(table: &[MilestoneDefinition], relationship: &Relationship) -> Vec<Milestone> {
    table
        .iter()
        .filter(|definition| is_unlocked(definition, relationship))
        .map(|definition| definition.id)
        .collect()
}

/// Milestones newly eligible for `relationship`, in contract enum order.
pub fn eligible_milestones(relationship: &Relationship) -> Vec<Milestone> {
    eligible_from(&MILESTONES, relationship)
}
