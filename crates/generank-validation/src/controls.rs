//! Positive- and negative-control validation.
//!
//! Both directions share one ranking primitive
//! ([`generank_scoring::ranking::percentile_ranks`]); only the success
//! criterion is inverted. Control genes absent from the scored population
//! are excluded from percentile computation but surfaced in the
//! expected-vs-found diagnostics, never silently dropped.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use generank_common::entities::ControlSet;
use generank_common::layers::EvidenceLayer;
use generank_common::run_config::{ControlConfig, TierConfig};
use generank_common::stats;

use generank_scoring::ranking::{percentile_ranks, top_n};
use generank_scoring::scorer::CompositeScoreRecord;
use generank_scoring::tiering::{classify, Tier};

/// Outcome of one validation check. `Indeterminate` (e.g. zero control
/// genes found in the population) is distinct from `Fail` and is caveated,
/// not counted against the verdict the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Indeterminate,
}

/// One recall@k measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallAtK {
    /// The requested cut point, as configured.
    pub k_spec: KSpec,
    /// The effective k after resolving fractions and capping at the
    /// population size.
    pub k: usize,
    /// Control symbols found within the top k.
    pub found: usize,
    /// found / unique control symbols present in the scored population;
    /// `None` when no control symbols are present at all.
    pub recall: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KSpec {
    Count(usize),
    Fraction(f64),
}

/// Per-control-source diagnostics, to detect asymmetric performance
/// between e.g. a disease-gene list and a pathway-gene list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub name: String,
    pub source: String,
    pub n_expected: usize,
    pub n_found: usize,
    pub median_percentile: Option<f64>,
    /// The recall@k grid evaluated against this source's own present
    /// symbols. A symbol listed by several sources counts in every one of
    /// them. Populated for positive-control validation; empty for negative.
    #[serde(default)]
    pub recall: Vec<RecallAtK>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositiveControlReport {
    pub outcome: CheckOutcome,
    /// Pass when median percentile >= this.
    pub threshold: f64,
    pub median_percentile: Option<f64>,
    /// Unique control symbols across all sets.
    pub n_expected: usize,
    /// Of those, how many appear in the scored population.
    pub n_found: usize,
    /// Control symbols absent from the scored population.
    pub missing: Vec<String>,
    pub recall: Vec<RecallAtK>,
    pub per_source: Vec<SourceBreakdown>,
    /// Layer with the largest mean contribution among found controls.
    pub dominant_layer: Option<EvidenceLayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegativeControlReport {
    pub outcome: CheckOutcome,
    /// Pass when median percentile < this.
    pub threshold: f64,
    pub median_percentile: Option<f64>,
    pub n_expected: usize,
    pub n_found: usize,
    pub missing: Vec<String>,
    /// Negative controls landing in the top quartile of the ranking.
    pub top_quartile_count: usize,
    /// Negative controls classified HIGH. Should be near zero for a
    /// specific scoring system.
    pub high_tier_count: usize,
    pub per_source: Vec<SourceBreakdown>,
    pub dominant_layer: Option<EvidenceLayer>,
}

/// Known genes must rank high: median percentile >= threshold, plus
/// recall@k over the configured k grid.
pub fn validate_positive(
    records: &[CompositeScoreRecord],
    sets: &[ControlSet],
    config: &ControlConfig,
) -> PositiveControlReport {
    let join = ControlJoin::build(records, sets);
    let threshold = config.positive_median_threshold;

    let median_percentile = stats::median(&join.found_percentiles);
    let outcome = match median_percentile {
        None => CheckOutcome::Indeterminate,
        Some(m) if m >= threshold => CheckOutcome::Pass,
        Some(_) => CheckOutcome::Fail,
    };

    let recall = recall_grid(records, &join.found_symbols, config);
    let mut per_source = join.per_source;
    for (breakdown, found) in per_source.iter_mut().zip(&join.per_source_found) {
        breakdown.recall = recall_grid(records, found, config);
    }

    info!(
        n_expected = join.n_expected,
        n_found = join.found_symbols.len(),
        ?outcome,
        "positive control validation complete"
    );

    PositiveControlReport {
        outcome,
        threshold,
        median_percentile,
        n_expected: join.n_expected,
        n_found: join.found_symbols.len(),
        missing: join.missing,
        recall,
        per_source,
        dominant_layer: join.dominant_layer,
    }
}

/// Housekeeping/generic genes must rank low: same percentile primitive,
/// inverted criterion (median percentile < threshold).
pub fn validate_negative(
    records: &[CompositeScoreRecord],
    sets: &[ControlSet],
    config: &ControlConfig,
    tiers: &TierConfig,
) -> NegativeControlReport {
    let join = ControlJoin::build(records, sets);
    let threshold = config.negative_median_threshold;

    let median_percentile = stats::median(&join.found_percentiles);
    let outcome = match median_percentile {
        None => CheckOutcome::Indeterminate,
        Some(m) if m < threshold => CheckOutcome::Pass,
        Some(_) => CheckOutcome::Fail,
    };

    let top_quartile_count = join.found_percentiles.iter().filter(|&&p| p > 0.75).count();
    let high_tier_count = records
        .iter()
        .filter(|r| join.found_symbols.contains(&r.symbol))
        .filter(|r| classify(r, tiers) == Tier::High)
        .count();

    info!(
        n_found = join.found_symbols.len(),
        top_quartile_count,
        high_tier_count,
        ?outcome,
        "negative control validation complete"
    );

    NegativeControlReport {
        outcome,
        threshold,
        median_percentile,
        n_expected: join.n_expected,
        n_found: join.found_symbols.len(),
        missing: join.missing,
        top_quartile_count,
        high_tier_count,
        per_source: join.per_source,
        dominant_layer: join.dominant_layer,
    }
}

// ── Shared join machinery ────────────────────────────────────────────────────

struct ControlJoin {
    n_expected: usize,
    found_symbols: BTreeSet<String>,
    found_percentiles: Vec<f64>,
    missing: Vec<String>,
    per_source: Vec<SourceBreakdown>,
    /// Found symbols per set, parallel to `per_source`.
    per_source_found: Vec<BTreeSet<String>>,
    dominant_layer: Option<EvidenceLayer>,
}

impl ControlJoin {
    fn build(records: &[CompositeScoreRecord], sets: &[ControlSet]) -> Self {
        let ranks = percentile_ranks(records);

        // One canonical record per symbol, so un-collapsed input (duplicate
        // primary ids sharing a symbol) joins through the same record that
        // symbol collapse would keep.
        let mut canonical: BTreeMap<&str, &CompositeScoreRecord> = BTreeMap::new();
        for record in records {
            match canonical.get(record.symbol.as_str()) {
                Some(current) if !record.beats(current) => {}
                _ => {
                    canonical.insert(record.symbol.as_str(), record);
                }
            }
        }

        // Symbol → percentile for scored genes only.
        let by_symbol: BTreeMap<&str, f64> = canonical
            .iter()
            .filter_map(|(&s, r)| ranks.get(&r.gene_id).map(|p| (s, *p)))
            .collect();

        // Deduplicate symbols appearing in multiple control sources.
        let unique: BTreeSet<&str> = sets
            .iter()
            .flat_map(|s| s.symbols.iter().map(String::as_str))
            .collect();

        let mut found_symbols = BTreeSet::new();
        let mut found_percentiles = Vec::new();
        let mut missing = Vec::new();
        for &symbol in &unique {
            match by_symbol.get(symbol) {
                Some(p) => {
                    found_symbols.insert(symbol.to_string());
                    found_percentiles.push(*p);
                }
                None => missing.push(symbol.to_string()),
            }
        }

        let mut per_source = Vec::with_capacity(sets.len());
        let mut per_source_found = Vec::with_capacity(sets.len());
        for set in sets {
            let symbols: BTreeSet<&str> = set.symbols.iter().map(String::as_str).collect();
            let mut found: BTreeSet<String> = BTreeSet::new();
            let mut percentiles = Vec::new();
            for &symbol in &symbols {
                if let Some(p) = by_symbol.get(symbol) {
                    found.insert(symbol.to_string());
                    percentiles.push(*p);
                }
            }
            per_source.push(SourceBreakdown {
                name: set.name.clone(),
                source: set.source.clone(),
                n_expected: symbols.len(),
                n_found: found.len(),
                median_percentile: stats::median(&percentiles),
                recall: Vec::new(),
            });
            per_source_found.push(found);
        }

        let dominant_layer = dominant_contribution_layer(records, &found_symbols);

        Self {
            n_expected: unique.len(),
            found_symbols,
            found_percentiles,
            missing,
            per_source,
            per_source_found,
            dominant_layer,
        }
    }
}

/// Layer with the largest mean contribution among the given symbols.
fn dominant_contribution_layer(
    records: &[CompositeScoreRecord],
    symbols: &BTreeSet<String>,
) -> Option<EvidenceLayer> {
    if symbols.is_empty() {
        return None;
    }
    let mut totals = [0.0f64; EvidenceLayer::COUNT];
    for record in records.iter().filter(|r| symbols.contains(&r.symbol)) {
        for (layer, contribution) in &record.contributions {
            totals[layer.index()] += contribution;
        }
    }
    let best = EvidenceLayer::ALL
        .into_iter()
        .max_by(|a, b| totals[a.index()].total_cmp(&totals[b.index()]))?;
    (totals[best.index()] > 0.0).then_some(best)
}

/// Recall@k over the configured count and fraction grid. Monotonically
/// non-decreasing in k for a fixed ranking and control set.
fn recall_grid(
    records: &[CompositeScoreRecord],
    found_symbols: &BTreeSet<String>,
    config: &ControlConfig,
) -> Vec<RecallAtK> {
    let n_scored = records
        .iter()
        .filter(|r| r.composite_score.is_some())
        .count();
    let symbol_of: BTreeMap<&str, &str> = records
        .iter()
        .map(|r| (r.gene_id.as_str(), r.symbol.as_str()))
        .collect();

    let mut specs: Vec<(KSpec, usize)> = config
        .recall_counts
        .iter()
        .map(|&k| (KSpec::Count(k), k.min(n_scored)))
        .collect();
    specs.extend(config.recall_fractions.iter().map(|&f| {
        (KSpec::Fraction(f), ((f * n_scored as f64).round() as usize).min(n_scored))
    }));

    specs
        .into_iter()
        .map(|(k_spec, k)| {
            let top: BTreeSet<String> = top_n(records, k)
                .into_iter()
                .filter_map(|id| symbol_of.get(id.as_str()).map(|s| s.to_string()))
                .collect();
            let found = found_symbols.iter().filter(|s| top.contains(*s)).count();
            let recall = if found_symbols.is_empty() {
                None
            } else {
                Some(found as f64 / found_symbols.len() as f64)
            };
            RecallAtK { k_spec, k, found, recall }
        })
        .collect()
}
