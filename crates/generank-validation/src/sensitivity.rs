//! Weight-perturbation sensitivity analysis.
//!
//! For every (layer, delta) pair the baseline weights are perturbed and
//! renormalized, the whole universe is rescored, and the baseline and
//! perturbed top-N rankings are compared by Spearman correlation on their
//! intersection. Perturbations are independent, so the sweep runs on a
//! rayon pool; results are re-sorted afterwards so parallelism never
//! changes the output.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use generank_common::entities::GeneRecord;
use generank_common::error::Result;
use generank_common::layers::EvidenceLayer;
use generank_common::run_config::{QualityConfig, SensitivityConfig};
use generank_common::stats;

use generank_scoring::evidence::EvidenceMatrix;
use generank_scoring::ranking::top_n;
use generank_scoring::scorer::score;
use generank_scoring::weights::LayerWeights;

use crate::controls::CheckOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Unstable,
    /// Top-N overlap too small (or score vectors degenerate) for a
    /// meaningful correlation. Excluded from stable/unstable tallies.
    Indeterminate,
}

/// One perturbation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub layer: EvidenceLayer,
    pub delta: f64,
    pub weights: LayerWeights,
    /// `None` signals insufficient overlap, never a fabricated value.
    pub spearman_rho: Option<f64>,
    /// Advisory only; the asymptotic approximation is unreliable below a
    /// few hundred observations. Never gates pass/fail.
    pub p_value: Option<f64>,
    /// Size of the baseline/perturbed top-N intersection.
    pub overlap: usize,
    pub stability: Stability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSensitivity {
    pub layer: EvidenceLayer,
    pub mean_rho: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivitySummary {
    pub results: Vec<SensitivityResult>,
    pub stability_threshold: f64,
    pub min_rho: Option<f64>,
    pub mean_rho: Option<f64>,
    pub max_rho: Option<f64>,
    pub stable_count: usize,
    pub unstable_count: usize,
    pub indeterminate_count: usize,
    pub per_layer: Vec<LayerSensitivity>,
    /// Lowest mean rho across its perturbations.
    pub most_sensitive: Option<EvidenceLayer>,
    /// Highest mean rho across its perturbations.
    pub most_robust: Option<EvidenceLayer>,
    pub outcome: CheckOutcome,
}

/// Run the full (layer × delta) sweep against a baseline.
pub fn analyze(
    universe: &[GeneRecord],
    matrix: &EvidenceMatrix,
    baseline: &LayerWeights,
    quality: &QualityConfig,
    config: &SensitivityConfig,
) -> Result<SensitivitySummary> {
    let baseline_records = score(universe, matrix, baseline, quality)?;
    let baseline_top = top_n(&baseline_records, config.top_n);
    let baseline_scores: BTreeMap<&str, f64> = baseline_records
        .iter()
        .filter_map(|r| r.composite_score.map(|s| (r.gene_id.as_str(), s)))
        .collect();

    let pairs: Vec<(EvidenceLayer, f64)> = EvidenceLayer::ALL
        .iter()
        .flat_map(|&layer| config.deltas.iter().map(move |&delta| (layer, delta)))
        .collect();

    let mut results: Vec<SensitivityResult> = pairs
        .par_iter()
        .map(|&(layer, delta)| {
            run_one(
                universe,
                matrix,
                baseline,
                quality,
                config,
                &baseline_top,
                &baseline_scores,
                layer,
                delta,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    // Parallel collection order is nondeterministic; fix it here.
    results.sort_by(|a, b| {
        a.layer
            .index()
            .cmp(&b.layer.index())
            .then_with(|| a.delta.total_cmp(&b.delta))
    });

    Ok(summarize(results, config))
}

#[allow(clippy::too_many_arguments)]
fn run_one(
    universe: &[GeneRecord],
    matrix: &EvidenceMatrix,
    baseline: &LayerWeights,
    quality: &QualityConfig,
    config: &SensitivityConfig,
    baseline_top: &[String],
    baseline_scores: &BTreeMap<&str, f64>,
    layer: EvidenceLayer,
    delta: f64,
) -> Result<SensitivityResult> {
    let weights = baseline.perturbed(layer, delta)?;
    let perturbed_records = score(universe, matrix, &weights, quality)?;
    let perturbed_top: BTreeSet<String> =
        top_n(&perturbed_records, config.top_n).into_iter().collect();
    let perturbed_scores: BTreeMap<&str, f64> = perturbed_records
        .iter()
        .filter_map(|r| r.composite_score.map(|s| (r.gene_id.as_str(), s)))
        .collect();

    // Intersection in baseline-top order (deterministic).
    let intersection: Vec<&str> = baseline_top
        .iter()
        .map(String::as_str)
        .filter(|id| perturbed_top.contains(*id))
        .collect();
    let overlap = intersection.len();

    let (spearman_rho, p_value) = if overlap < config.min_overlap {
        (None, None)
    } else {
        let xs: Vec<f64> = intersection.iter().map(|id| baseline_scores[id]).collect();
        let ys: Vec<f64> = intersection.iter().map(|id| perturbed_scores[id]).collect();
        match stats::spearman(&xs, &ys) {
            Some((rho, p)) => (Some(rho), Some(p)),
            None => (None, None),
        }
    };

    let stability = match spearman_rho {
        None => Stability::Indeterminate,
        Some(rho) if rho >= config.stability_threshold => Stability::Stable,
        Some(_) => Stability::Unstable,
    };

    Ok(SensitivityResult {
        layer,
        delta,
        weights,
        spearman_rho,
        p_value,
        overlap,
        stability,
    })
}

fn summarize(results: Vec<SensitivityResult>, config: &SensitivityConfig) -> SensitivitySummary {
    let rhos: Vec<f64> = results.iter().filter_map(|r| r.spearman_rho).collect();

    let stable_count = results.iter().filter(|r| r.stability == Stability::Stable).count();
    let unstable_count = results.iter().filter(|r| r.stability == Stability::Unstable).count();
    let indeterminate_count = results.len() - stable_count - unstable_count;

    let per_layer: Vec<LayerSensitivity> = EvidenceLayer::ALL
        .iter()
        .map(|&layer| {
            let layer_rhos: Vec<f64> = results
                .iter()
                .filter(|r| r.layer == layer)
                .filter_map(|r| r.spearman_rho)
                .collect();
            LayerSensitivity { layer, mean_rho: stats::mean(&layer_rhos) }
        })
        .collect();

    let with_mean: Vec<(&LayerSensitivity, f64)> = per_layer
        .iter()
        .filter_map(|l| l.mean_rho.map(|m| (l, m)))
        .collect();
    let most_sensitive = with_mean
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(l, _)| l.layer);
    let most_robust = with_mean
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(l, _)| l.layer);

    let outcome = if stable_count == 0 && unstable_count == 0 {
        CheckOutcome::Indeterminate
    } else if unstable_count == 0 {
        CheckOutcome::Pass
    } else {
        CheckOutcome::Fail
    };

    info!(
        stable_count,
        unstable_count, indeterminate_count, ?outcome, "sensitivity sweep complete"
    );

    SensitivitySummary {
        stability_threshold: config.stability_threshold,
        min_rho: rhos.iter().copied().min_by(|a, b| a.total_cmp(b)),
        mean_rho: stats::mean(&rhos),
        max_rho: rhos.iter().copied().max_by(|a, b| a.total_cmp(b)),
        stable_count,
        unstable_count,
        indeterminate_count,
        per_layer,
        most_sensitive,
        most_robust,
        outcome,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use generank_common::run_config::WeightsConfig;
    use generank_test_utils::{evidence_from_fn, synthetic_universe};

    fn setup(n: usize) -> (Vec<GeneRecord>, EvidenceMatrix) {
        let universe = synthetic_universe(n);
        // Smooth, fully-populated evidence: gene i scores (i+1)/(n+1)
        // shifted slightly per layer so layers disagree a little.
        let tables = evidence_from_fn(&universe, |i, layer| {
            let base = (i + 1) as f64 / (n + 1) as f64;
            let wobble = layer.index() as f64 * 0.002 * if i % 2 == 0 { 1.0 } else { -1.0 };
            Some((base + wobble).clamp(0.0, 1.0))
        });
        let matrix = EvidenceMatrix::build(&universe, &tables).unwrap();
        (universe, matrix)
    }

    fn config(top_n: usize) -> SensitivityConfig {
        SensitivityConfig { top_n, ..SensitivityConfig::default() }
    }

    #[test]
    fn test_sweep_covers_all_pairs() {
        let (universe, matrix) = setup(60);
        let baseline = LayerWeights::from_config(&WeightsConfig::default()).unwrap();
        let summary = analyze(
            &universe,
            &matrix,
            &baseline,
            &QualityConfig::default(),
            &config(40),
        )
        .unwrap();
        assert_eq!(summary.results.len(), 6 * 4);
    }

    #[test]
    fn test_stable_on_smooth_data() {
        let (universe, matrix) = setup(60);
        let baseline = LayerWeights::from_config(&WeightsConfig::default()).unwrap();
        let summary = analyze(
            &universe,
            &matrix,
            &baseline,
            &QualityConfig::default(),
            &config(40),
        )
        .unwrap();
        // Near-identical layers: perturbation barely moves the ranking.
        assert_eq!(summary.outcome, CheckOutcome::Pass);
        assert!(summary.min_rho.unwrap() >= 0.85);
        assert!(summary.most_sensitive.is_some());
        assert!(summary.most_robust.is_some());
    }

    #[test]
    fn test_small_overlap_is_indeterminate() {
        let (universe, matrix) = setup(20);
        let baseline = LayerWeights::from_config(&WeightsConfig::default()).unwrap();
        let mut cfg = config(5);
        cfg.min_overlap = 10; // top-5 can never reach 10 overlapping genes
        let summary = analyze(
            &universe,
            &matrix,
            &baseline,
            &QualityConfig::default(),
            &cfg,
        )
        .unwrap();
        assert_eq!(summary.outcome, CheckOutcome::Indeterminate);
        assert!(summary.results.iter().all(|r| r.spearman_rho.is_none()));
    }

    #[test]
    fn test_results_deterministically_ordered() {
        let (universe, matrix) = setup(40);
        let baseline = LayerWeights::from_config(&WeightsConfig::default()).unwrap();
        let a = analyze(&universe, &matrix, &baseline, &QualityConfig::default(), &config(30))
            .unwrap();
        let b = analyze(&universe, &matrix, &baseline, &QualityConfig::default(), &config(30))
            .unwrap();
        for (ra, rb) in a.results.iter().zip(b.results.iter()) {
            assert_eq!(ra.layer, rb.layer);
            assert_eq!(ra.delta, rb.delta);
            assert_eq!(
                ra.spearman_rho.map(f64::to_bits),
                rb.spearman_rho.map(f64::to_bits)
            );
        }
    }

    #[test]
    fn test_clamp_to_zero_weight_does_not_crash() {
        let (universe, matrix) = setup(30);
        // Literature already tiny; a -0.10 delta clamps it to 0.
        let baseline =
            LayerWeights::new([0.24, 0.24, 0.24, 0.24, 0.02, 0.02]).unwrap();
        let summary = analyze(
            &universe,
            &matrix,
            &baseline,
            &QualityConfig::default(),
            &config(20),
        )
        .unwrap();
        let zeroed = summary
            .results
            .iter()
            .find(|r| r.layer == EvidenceLayer::Literature && r.delta == -0.10)
            .unwrap();
        assert_eq!(zeroed.weights.get(EvidenceLayer::Literature), 0.0);
        let sum: f64 = zeroed.weights.as_array().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}
