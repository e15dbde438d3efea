//! Confidence tier classification.
//!
//! A pure function of composite score and evidence breadth against
//! explicit configured thresholds; the validation loop re-tiers perturbed
//! scores through the same function with no code changes.

use serde::{Deserialize, Serialize};

use generank_common::run_config::TierConfig;

use crate::scorer::CompositeScoreRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    High,
    Medium,
    Low,
}

/// HIGH needs both a high score and broad evidence, so a single-layer
/// lucky high score cannot reach the top tier. NULL scores are always LOW.
pub fn classify(record: &CompositeScoreRecord, thresholds: &TierConfig) -> Tier {
    let Some(score) = record.composite_score else {
        return Tier::Low;
    };
    if score >= thresholds.high_min_score && record.evidence_count >= thresholds.high_min_evidence
    {
        return Tier::High;
    }
    if score >= thresholds.medium_min_score
        && record.evidence_count >= thresholds.medium_min_evidence
    {
        return Tier::Medium;
    }
    Tier::Low
}
