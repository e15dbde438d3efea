//! Validated per-layer scoring weights.
//!
//! `LayerWeights` is an immutable value type: every instance that exists
//! satisfies the non-negative, sum-to-1.0 invariant, because the only way
//! to obtain one is through a validating constructor. Perturbation returns
//! a fresh validated instance and never mutates the baseline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use generank_common::error::{GenerankError, Result};
use generank_common::layers::EvidenceLayer;
use generank_common::run_config::{WeightsConfig, WEIGHT_SUM_TOLERANCE};

/// Per-layer weights, stored in canonical [`EvidenceLayer::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<EvidenceLayer, f64>", into = "BTreeMap<EvidenceLayer, f64>")]
pub struct LayerWeights {
    weights: [f64; EvidenceLayer::COUNT],
}

impl LayerWeights {
    /// Build from a per-layer array in canonical order. Rejects negative,
    /// non-finite, or non-unit-sum configurations before any scoring runs.
    pub fn new(weights: [f64; EvidenceLayer::COUNT]) -> Result<Self> {
        for layer in EvidenceLayer::ALL {
            let w = weights[layer.index()];
            if !w.is_finite() || w < 0.0 {
                return Err(GenerankError::Config(format!(
                    "weight for layer {layer} must be a non-negative finite number, got {w}"
                )));
            }
        }
        // Fixed summation order keeps validation reproducible.
        let sum: f64 = EvidenceLayer::ALL.iter().map(|l| weights[l.index()]).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(GenerankError::Config(format!(
                "layer weights must sum to 1.0 within {WEIGHT_SUM_TOLERANCE} (got {sum:.8})"
            )));
        }
        Ok(Self { weights })
    }

    pub fn from_config(config: &WeightsConfig) -> Result<Self> {
        let mut weights = [0.0; EvidenceLayer::COUNT];
        for layer in EvidenceLayer::ALL {
            weights[layer.index()] = config.get(layer);
        }
        Self::new(weights)
    }

    pub fn get(&self, layer: EvidenceLayer) -> f64 {
        self.weights[layer.index()]
    }

    pub fn as_array(&self) -> [f64; EvidenceLayer::COUNT] {
        self.weights
    }

    pub fn as_map(&self) -> BTreeMap<EvidenceLayer, f64> {
        EvidenceLayer::ALL.iter().map(|&l| (l, self.get(l))).collect()
    }

    /// Produce a new weight configuration with `delta` added to `layer`,
    /// clamped to [0, 1], and every weight renormalized so the sum-to-1.0
    /// invariant holds on the result. A weight clamped to exactly 0 is
    /// valid; it simply removes that layer's influence.
    ///
    /// A zero delta returns the weights unchanged.
    pub fn perturbed(&self, layer: EvidenceLayer, delta: f64) -> Result<Self> {
        if delta == 0.0 {
            return Ok(self.clone());
        }
        if !delta.is_finite() {
            return Err(GenerankError::Config(format!(
                "perturbation delta must be finite, got {delta}"
            )));
        }

        let mut weights = self.weights;
        weights[layer.index()] = (weights[layer.index()] + delta).clamp(0.0, 1.0);

        let sum: f64 = EvidenceLayer::ALL.iter().map(|l| weights[l.index()]).sum();
        if sum <= 0.0 {
            return Err(GenerankError::Config(format!(
                "perturbing {layer} by {delta} left no weight to renormalize"
            )));
        }
        for w in weights.iter_mut() {
            *w /= sum;
        }
        Self::new(weights)
    }
}

impl TryFrom<BTreeMap<EvidenceLayer, f64>> for LayerWeights {
    type Error = GenerankError;

    fn try_from(map: BTreeMap<EvidenceLayer, f64>) -> Result<Self> {
        let mut weights = [0.0; EvidenceLayer::COUNT];
        for layer in EvidenceLayer::ALL {
            let w = map.get(&layer).ok_or_else(|| {
                GenerankError::Config(format!("missing weight for layer {layer}"))
            })?;
            weights[layer.index()] = *w;
        }
        Self::new(weights)
    }
}

impl From<LayerWeights> for BTreeMap<EvidenceLayer, f64> {
    fn from(w: LayerWeights) -> Self {
        w.as_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> LayerWeights {
        LayerWeights::from_config(&WeightsConfig::default()).unwrap()
    }

    #[test]
    fn test_default_config_weights_valid() {
        let w = baseline();
        let sum: f64 = w.as_array().iter().sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_invalid_sum_rejected() {
        let result = LayerWeights::new([0.3, 0.3, 0.3, 0.3, 0.3, 0.3]);
        assert!(matches!(result, Err(GenerankError::Config(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = LayerWeights::new([-0.1, 0.3, 0.2, 0.2, 0.2, 0.2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_weight_is_valid() {
        let w = LayerWeights::new([0.0, 0.2, 0.2, 0.2, 0.2, 0.2]).unwrap();
        assert_eq!(w.get(EvidenceLayer::GeneticConstraint), 0.0);
    }

    #[test]
    fn test_perturb_zero_delta_is_identity() {
        let w = baseline();
        let p = w.perturbed(EvidenceLayer::Literature, 0.0).unwrap();
        assert_eq!(w, p);
    }

    #[test]
    fn test_perturb_renormalizes() {
        // 0.20 + 0.10 = 0.30 over a new total of 1.10
        let w = baseline();
        let p = w.perturbed(EvidenceLayer::GeneticConstraint, 0.10).unwrap();
        let expected = 0.30 / 1.10;
        assert!((p.get(EvidenceLayer::GeneticConstraint) - expected).abs() < 1e-12);
        let sum: f64 = p.as_array().iter().sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
        // Baseline is untouched
        assert!((w.get(EvidenceLayer::GeneticConstraint) - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_perturb_clamps_to_zero() {
        let w = baseline();
        let p = w.perturbed(EvidenceLayer::Literature, -0.50).unwrap();
        assert_eq!(p.get(EvidenceLayer::Literature), 0.0);
        let sum: f64 = p.as_array().iter().sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_perturb_negative_never_produced() {
        let w = baseline();
        for layer in EvidenceLayer::ALL {
            for delta in [-1.0, -0.10, -0.05, 0.05, 0.10, 1.0] {
                let p = w.perturbed(layer, delta).unwrap();
                assert!(p.as_array().iter().all(|&x| x >= 0.0));
            }
        }
    }

    #[test]
    fn test_serde_map_roundtrip() {
        let w = baseline();
        let json = serde_json::to_string(&w).unwrap();
        let back: LayerWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
    }

    #[test]
    fn test_serde_rejects_invalid_map() {
        let json = r#"{"genetic_constraint": 0.9, "tissue_expression": 0.9,
            "protein_features": 0.0, "subcellular_localization": 0.0,
            "model_phenotype": 0.0, "literature": 0.0}"#;
        let result: std::result::Result<LayerWeights, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
