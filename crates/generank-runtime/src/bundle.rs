//! The materialized evidence bundle handed over by the external retrieval
//! layer: gene universe, one table per layer, and the control sets.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use generank_common::entities::{ControlSet, EvidenceRow, GeneRecord, LayerTable};
use generank_common::error::Result;
use generank_common::layers::EvidenceLayer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub genes: Vec<GeneRecord>,
    /// Layer name → rows. Unknown layer names fail deserialization.
    pub layers: BTreeMap<EvidenceLayer, Vec<EvidenceRow>>,
    #[serde(default)]
    pub positive_controls: Vec<ControlSet>,
    #[serde(default)]
    pub negative_controls: Vec<ControlSet>,
}

impl EvidenceBundle {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let bundle: Self = serde_json::from_str(&content)?;
        Ok(bundle)
    }

    pub fn layer_tables(&self) -> Vec<LayerTable> {
        self.layers
            .iter()
            .map(|(&layer, rows)| LayerTable { layer, rows: rows.clone() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_parses() {
        let json = r#"{
            "genes": [{"primary_id": "G1", "symbol": "ABC1"}],
            "layers": {
                "literature": [{"gene_id": "G1", "score": 0.4}],
                "genetic_constraint": [{"gene_id": "G1", "score": null}]
            },
            "positive_controls": [
                {"name": "known", "source": "curated", "symbols": ["ABC1"]}
            ]
        }"#;
        let bundle: EvidenceBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.genes.len(), 1);
        assert_eq!(bundle.layer_tables().len(), 2);
        assert!(bundle.negative_controls.is_empty());
    }

    #[test]
    fn test_unknown_layer_rejected() {
        let json = r#"{
            "genes": [],
            "layers": {"promoter_methylation": []}
        }"#;
        let result: std::result::Result<EvidenceBundle, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
