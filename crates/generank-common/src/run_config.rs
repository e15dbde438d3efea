//! Run configuration for a prioritization run.
//!
//! Every tunable the engine exposes lives here: layer weights, tier
//! thresholds, quality-flag cutoffs, QC outlier multiplier, sensitivity
//! sweep parameters, and control pass criteria. Loaded from YAML, JSON, or
//! TOML and validated before anything is scored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GenerankError, Result};
use crate::layers::EvidenceLayer;

/// Tolerance for the weights-sum-to-1.0 invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Complete run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Per-layer scoring weights.
    #[serde(default)]
    pub weights: WeightsConfig,

    /// Tier classification thresholds.
    #[serde(default)]
    pub tiers: TierConfig,

    /// Evidence-count cutoffs for the quality flag.
    #[serde(default)]
    pub quality: QualityConfig,

    /// QC diagnostics settings.
    #[serde(default)]
    pub qc: QcConfig,

    /// Weight-perturbation sensitivity sweep settings.
    #[serde(default)]
    pub sensitivity: SensitivityConfig,

    /// Positive/negative control pass criteria.
    #[serde(default)]
    pub controls: ControlConfig,
}

// ── Weights ──────────────────────────────────────────────────────────────────

/// Named per-layer weights. Must be non-negative and sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_constraint_weight")]
    pub genetic_constraint: f64,

    #[serde(default = "default_expression_weight")]
    pub tissue_expression: f64,

    #[serde(default = "default_protein_weight")]
    pub protein_features: f64,

    #[serde(default = "default_localization_weight")]
    pub subcellular_localization: f64,

    #[serde(default = "default_phenotype_weight")]
    pub model_phenotype: f64,

    #[serde(default = "default_literature_weight")]
    pub literature: f64,
}

fn default_constraint_weight() -> f64 { 0.20 }
fn default_expression_weight() -> f64 { 0.15 }
fn default_protein_weight() -> f64 { 0.15 }
fn default_localization_weight() -> f64 { 0.15 }
fn default_phenotype_weight() -> f64 { 0.20 }
fn default_literature_weight() -> f64 { 0.15 }

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            genetic_constraint:       default_constraint_weight(),
            tissue_expression:        default_expression_weight(),
            protein_features:         default_protein_weight(),
            subcellular_localization: default_localization_weight(),
            model_phenotype:          default_phenotype_weight(),
            literature:               default_literature_weight(),
        }
    }
}

impl WeightsConfig {
    pub fn get(&self, layer: EvidenceLayer) -> f64 {
        match layer {
            EvidenceLayer::GeneticConstraint       => self.genetic_constraint,
            EvidenceLayer::TissueExpression        => self.tissue_expression,
            EvidenceLayer::ProteinFeatures         => self.protein_features,
            EvidenceLayer::SubcellularLocalization => self.subcellular_localization,
            EvidenceLayer::ModelPhenotype          => self.model_phenotype,
            EvidenceLayer::Literature              => self.literature,
        }
    }

    /// Weights in canonical layer order.
    pub fn as_map(&self) -> BTreeMap<EvidenceLayer, f64> {
        EvidenceLayer::ALL.iter().map(|&l| (l, self.get(l))).collect()
    }
}

// ── Tiers ────────────────────────────────────────────────────────────────────

/// Thresholds for HIGH/MEDIUM/LOW classification. HIGH couples a score
/// cutoff with a minimum evidence breadth so a single lucky layer cannot
/// reach the top tier on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "default_high_score")]
    pub high_min_score: f64,

    #[serde(default = "default_high_evidence")]
    pub high_min_evidence: u8,

    #[serde(default = "default_medium_score")]
    pub medium_min_score: f64,

    #[serde(default = "default_medium_evidence")]
    pub medium_min_evidence: u8,
}

fn default_high_score() -> f64 { 0.70 }
fn default_high_evidence() -> u8 { 4 }
fn default_medium_score() -> f64 { 0.50 }
fn default_medium_evidence() -> u8 { 2 }

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            high_min_score:      default_high_score(),
            high_min_evidence:   default_high_evidence(),
            medium_min_score:    default_medium_score(),
            medium_min_evidence: default_medium_evidence(),
        }
    }
}

// ── Quality flag ─────────────────────────────────────────────────────────────

/// Evidence-count cutoffs for the quality flag buckets:
/// count >= sufficient_min → sufficient; >= moderate_min → moderate;
/// >= 1 → sparse; 0 → none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_sufficient_min")]
    pub sufficient_min: u8,

    #[serde(default = "default_moderate_min")]
    pub moderate_min: u8,
}

fn default_sufficient_min() -> u8 { 4 }
fn default_moderate_min() -> u8 { 2 }

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            sufficient_min: default_sufficient_min(),
            moderate_min:   default_moderate_min(),
        }
    }
}

// ── QC ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcConfig {
    /// A composite score is an outlier when
    /// |score - median| > mad_multiplier * (1.4826 * MAD).
    #[serde(default = "default_mad_multiplier")]
    pub mad_multiplier: f64,
}

fn default_mad_multiplier() -> f64 { 3.0 }

impl Default for QcConfig {
    fn default() -> Self {
        Self { mad_multiplier: default_mad_multiplier() }
    }
}

// ── Sensitivity ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Symmetric perturbation deltas applied to each layer weight.
    #[serde(default = "default_deltas")]
    pub deltas: Vec<f64>,

    /// Ranking depth compared between baseline and perturbed runs.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Minimum top-N intersection size below which no correlation is
    /// computed (recorded as indeterminate instead).
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,

    /// A perturbation is "stable" when spearman rho >= this.
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,
}

fn default_deltas() -> Vec<f64> { vec![-0.10, -0.05, 0.05, 0.10] }
fn default_top_n() -> usize { 2000 }
fn default_min_overlap() -> usize { 10 }
fn default_stability_threshold() -> f64 { 0.85 }

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            deltas:              default_deltas(),
            top_n:               default_top_n(),
            min_overlap:         default_min_overlap(),
            stability_threshold: default_stability_threshold(),
        }
    }
}

// ── Controls ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Positive controls pass when their median percentile >= this.
    #[serde(default = "default_positive_median")]
    pub positive_median_threshold: f64,

    /// Negative controls pass when their median percentile < this.
    #[serde(default = "default_negative_median")]
    pub negative_median_threshold: f64,

    /// Fixed-count recall@k cut points.
    #[serde(default = "default_recall_counts")]
    pub recall_counts: Vec<usize>,

    /// Fractional recall@k cut points over the scored population.
    #[serde(default = "default_recall_fractions")]
    pub recall_fractions: Vec<f64>,
}

fn default_positive_median() -> f64 { 0.75 }
fn default_negative_median() -> f64 { 0.50 }
fn default_recall_counts() -> Vec<usize> { vec![100, 500, 1000, 2000] }
fn default_recall_fractions() -> Vec<f64> { vec![0.05, 0.10, 0.20] }

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            positive_median_threshold: default_positive_median(),
            negative_median_threshold: default_negative_median(),
            recall_counts:             default_recall_counts(),
            recall_fractions:          default_recall_fractions(),
        }
    }
}

// ── Loading & validation ─────────────────────────────────────────────────────

impl RunConfig {
    pub fn from_yaml(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load by file extension (.yaml/.yml, .json, .toml).
    pub fn load(path: &str) -> Result<Self> {
        match path.rsplit('.').next() {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            Some("json") => Self::from_json(path),
            Some("toml") => Self::from_toml(path),
            _ => Err(GenerankError::Config(format!(
                "unrecognized config extension: {path}"
            ))),
        }
    }

    /// Fail fast on any invalid tunable. Nothing is silently corrected.
    pub fn validate(&self) -> Result<()> {
        for layer in EvidenceLayer::ALL {
            let w = self.weights.get(layer);
            if !w.is_finite() || w < 0.0 {
                return Err(GenerankError::Config(format!(
                    "weight for layer {layer} must be a non-negative finite number, got {w}"
                )));
            }
        }
        let sum: f64 = EvidenceLayer::ALL.iter().map(|&l| self.weights.get(l)).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(GenerankError::Config(format!(
                "layer weights must sum to 1.0 (got {sum:.8})"
            )));
        }

        for (name, v) in [
            ("tiers.high_min_score", self.tiers.high_min_score),
            ("tiers.medium_min_score", self.tiers.medium_min_score),
            ("controls.positive_median_threshold", self.controls.positive_median_threshold),
            ("controls.negative_median_threshold", self.controls.negative_median_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(GenerankError::Config(format!(
                    "{name} must lie in [0, 1], got {v}"
                )));
            }
        }
        if self.tiers.medium_min_score > self.tiers.high_min_score {
            return Err(GenerankError::Config(
                "tiers.medium_min_score must not exceed tiers.high_min_score".into(),
            ));
        }
        if self.tiers.medium_min_evidence > self.tiers.high_min_evidence {
            return Err(GenerankError::Config(
                "tiers.medium_min_evidence must not exceed tiers.high_min_evidence".into(),
            ));
        }
        if self.quality.moderate_min > self.quality.sufficient_min {
            return Err(GenerankError::Config(
                "quality.moderate_min must not exceed quality.sufficient_min".into(),
            ));
        }
        if self.quality.moderate_min < 1 {
            return Err(GenerankError::Config(
                "quality.moderate_min must be at least 1".into(),
            ));
        }
        if self.qc.mad_multiplier <= 0.0 {
            return Err(GenerankError::Config(
                "qc.mad_multiplier must be positive".into(),
            ));
        }
        if self.sensitivity.deltas.is_empty() {
            return Err(GenerankError::Config(
                "sensitivity.deltas must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sensitivity.stability_threshold) {
            return Err(GenerankError::Config(
                "sensitivity.stability_threshold must lie in [0, 1]".into(),
            ));
        }
        if self.sensitivity.top_n == 0 {
            return Err(GenerankError::Config(
                "sensitivity.top_n must be positive".into(),
            ));
        }
        // Spearman is undefined below three observations.
        if self.sensitivity.min_overlap < 3 {
            return Err(GenerankError::Config(
                "sensitivity.min_overlap must be at least 3".into(),
            ));
        }
        for &f in &self.controls.recall_fractions {
            if !(0.0..=1.0).contains(&f) {
                return Err(GenerankError::Config(format!(
                    "controls.recall_fractions entries must lie in [0, 1], got {f}"
                )));
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = WeightsConfig::default();
        let sum: f64 = EvidenceLayer::ALL.iter().map(|&l| weights.get(l)).sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_bad_weight_sum_rejected() {
        let mut config = RunConfig::default();
        config.weights.literature += 0.10;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GenerankError::Config(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = RunConfig::default();
        config.weights.literature = -0.15;
        config.weights.genetic_constraint = 0.50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_tier_thresholds_rejected() {
        let mut config = RunConfig::default();
        config.tiers.medium_min_score = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_tier_evidence_rejected() {
        let mut config = RunConfig::default();
        config.tiers.medium_min_evidence = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_min_overlap_rejected() {
        let mut config = RunConfig::default();
        config.sensitivity.min_overlap = 2;
        assert!(config.validate().is_err());
        config.sensitivity.min_overlap = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = RunConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: RunConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.weights.genetic_constraint, config.weights.genetic_constraint);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let parsed: RunConfig = serde_yaml::from_str("qc:\n  mad_multiplier: 2.5\n").unwrap();
        assert_eq!(parsed.qc.mad_multiplier, 2.5);
        assert_eq!(parsed.sensitivity.top_n, 2000);
        assert!(parsed.validate().is_ok());
    }
}
