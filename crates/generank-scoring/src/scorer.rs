//! Composite score computation.
//!
//! The composite is a NULL-preserving weighted mean: the weighted sum over
//! present layers divided by the weight available to those layers. Dividing
//! by available weight rather than total weight keeps sparse-evidence genes
//! from being penalized for absence, at the cost of letting a gene with one
//! high-scoring layer sit above a gene with broad moderate evidence. That
//! trade-off is deliberate and carried as-is; `evidence_count` travels on
//! every record so downstream consumers can apply a breadth floor instead
//! of trusting the score alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use generank_common::entities::GeneRecord;
use generank_common::error::Result;
use generank_common::layers::EvidenceLayer;
use generank_common::run_config::QualityConfig;

use crate::evidence::EvidenceMatrix;
use crate::weights::LayerWeights;

/// Evidence-breadth bucket derived from `evidence_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    Sufficient,
    Moderate,
    Sparse,
    None,
}

impl QualityFlag {
    pub fn from_count(count: u8, config: &QualityConfig) -> Self {
        if count == 0 {
            QualityFlag::None
        } else if count >= config.sufficient_min {
            QualityFlag::Sufficient
        } else if count >= config.moderate_min {
            QualityFlag::Moderate
        } else {
            QualityFlag::Sparse
        }
    }
}

/// One scored gene. Recomputed fresh on every scoring invocation; always
/// re-derivable from the evidence matrix and the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeScoreRecord {
    pub gene_id: String,
    pub symbol: String,
    /// `None` only when every layer is absent for this gene.
    pub composite_score: Option<f64>,
    /// Number of layers with a present score (0–6).
    pub evidence_count: u8,
    pub quality_flag: QualityFlag,
    /// score × weight per present layer, kept for explainability.
    pub contributions: BTreeMap<EvidenceLayer, f64>,
}

/// Score every gene in the universe. Output is sorted by gene id, and all
/// per-gene arithmetic walks layers in canonical order, so equal inputs
/// produce bit-identical output.
pub fn score(
    universe: &[GeneRecord],
    matrix: &EvidenceMatrix,
    weights: &LayerWeights,
    quality: &QualityConfig,
) -> Result<Vec<CompositeScoreRecord>> {
    let mut genes: Vec<&GeneRecord> = universe.iter().collect();
    genes.sort_by(|a, b| a.primary_id.cmp(&b.primary_id));
    genes.dedup_by(|a, b| a.primary_id == b.primary_id);

    let mut records = Vec::with_capacity(genes.len());
    for gene in genes {
        records.push(score_one(gene, matrix, weights, quality));
    }
    debug!(
        scored = records.iter().filter(|r| r.composite_score.is_some()).count(),
        total = records.len(),
        "composite scoring complete"
    );
    Ok(records)
}

fn score_one(
    gene: &GeneRecord,
    matrix: &EvidenceMatrix,
    weights: &LayerWeights,
    quality: &QualityConfig,
) -> CompositeScoreRecord {
    let mut available_weight = 0.0;
    let mut weighted_sum = 0.0;
    let mut evidence_count: u8 = 0;
    let mut contributions = BTreeMap::new();

    for layer in EvidenceLayer::ALL {
        let Some(s) = matrix.get(&gene.primary_id, layer) else {
            continue;
        };
        let w = weights.get(layer);
        available_weight += w;
        weighted_sum += w * s;
        evidence_count += 1;
        contributions.insert(layer, w * s);
    }

    // A gene whose only present layers carry zero weight has evidence but
    // no usable denominator; its score is absent, not zero.
    let composite_score = if evidence_count > 0 && available_weight > 0.0 {
        Some(weighted_sum / available_weight)
    } else {
        None
    };

    CompositeScoreRecord {
        gene_id: gene.primary_id.clone(),
        symbol: gene.symbol.clone(),
        composite_score,
        evidence_count,
        quality_flag: QualityFlag::from_count(evidence_count, quality),
        contributions,
    }
}

impl CompositeScoreRecord {
    /// Canonical-record preference between two records sharing a symbol:
    /// most present evidence, tie-broken by highest composite score, then
    /// lowest primary id. The same rule governs symbol collapse and any
    /// downstream symbol lookup over un-collapsed records.
    pub fn beats(&self, incumbent: &Self) -> bool {
        if self.evidence_count != incumbent.evidence_count {
            return self.evidence_count > incumbent.evidence_count;
        }
        let cs = self.composite_score.unwrap_or(f64::NEG_INFINITY);
        let is = incumbent.composite_score.unwrap_or(f64::NEG_INFINITY);
        if cs != is {
            return cs > is;
        }
        self.gene_id < incumbent.gene_id
    }
}

/// Collapse records to one canonical record per symbol, per
/// [`CompositeScoreRecord::beats`]. Output stays sorted by gene id.
pub fn collapse_by_symbol(records: Vec<CompositeScoreRecord>) -> Vec<CompositeScoreRecord> {
    let mut best: BTreeMap<String, CompositeScoreRecord> = BTreeMap::new();
    for record in records {
        match best.get(&record.symbol) {
            Some(current) if !record.beats(current) => {}
            _ => {
                best.insert(record.symbol.clone(), record);
            }
        }
    }
    let mut collapsed: Vec<CompositeScoreRecord> = best.into_values().collect();
    collapsed.sort_by(|a, b| a.gene_id.cmp(&b.gene_id));
    collapsed
}
