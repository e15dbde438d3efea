//! Assembly of per-layer evidence tables into a per-gene evidence matrix.
//!
//! The retrieval layer hands over one table per layer, keyed by primary
//! gene id with a nullable score. Assembly validates each row: scores
//! outside [0, 1] and rows for genes outside the universe become recorded
//! data issues and are excluded from scoring, never fatal to the run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use generank_common::entities::{GeneRecord, LayerTable};
use generank_common::error::{GenerankError, Result};
use generank_common::layers::EvidenceLayer;

/// A non-fatal input problem, surfaced in the validation report caveats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIssue {
    pub layer: Option<EvidenceLayer>,
    pub gene_id: String,
    pub detail: String,
}

/// Per-gene evidence slots, one `Option<f64>` per layer. Absence is a
/// tagged case, never a sentinel value.
#[derive(Debug, Clone)]
pub struct EvidenceMatrix {
    slots: BTreeMap<String, [Option<f64>; EvidenceLayer::COUNT]>,
    issues: Vec<DataIssue>,
}

impl EvidenceMatrix {
    /// Build the matrix for a gene universe from per-layer tables.
    ///
    /// Two tables for the same layer are a configuration error (the input
    /// contract is one table per layer); bad rows are recorded and
    /// skipped.
    pub fn build(universe: &[GeneRecord], tables: &[LayerTable]) -> Result<Self> {
        let mut slots: BTreeMap<String, [Option<f64>; EvidenceLayer::COUNT]> = universe
            .iter()
            .map(|g| (g.primary_id.clone(), [None; EvidenceLayer::COUNT]))
            .collect();

        if slots.len() < universe.len() {
            // Duplicate primary ids collapse into one slot; note it.
            warn!(
                universe = universe.len(),
                distinct = slots.len(),
                "gene universe contains duplicate primary ids"
            );
        }

        let mut issues = Vec::new();
        let mut seen = [false; EvidenceLayer::COUNT];

        for table in tables {
            let idx = table.layer.index();
            if seen[idx] {
                return Err(GenerankError::Config(format!(
                    "duplicate evidence table for layer {}",
                    table.layer
                )));
            }
            seen[idx] = true;

            for row in &table.rows {
                let Some(slot) = slots.get_mut(&row.gene_id) else {
                    issues.push(DataIssue {
                        layer: Some(table.layer),
                        gene_id: row.gene_id.clone(),
                        detail: "evidence row for gene outside the universe".into(),
                    });
                    continue;
                };
                let Some(score) = row.score else {
                    // Explicit null: not measured. Nothing to record.
                    continue;
                };
                if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                    issues.push(DataIssue {
                        layer: Some(table.layer),
                        gene_id: row.gene_id.clone(),
                        detail: format!("score {score} outside [0, 1]; treated as absent"),
                    });
                    continue;
                }
                if slot[idx].is_some() {
                    issues.push(DataIssue {
                        layer: Some(table.layer),
                        gene_id: row.gene_id.clone(),
                        detail: "duplicate evidence row; first value kept".into(),
                    });
                    continue;
                }
                slot[idx] = Some(score);
            }
        }

        if !issues.is_empty() {
            warn!(count = issues.len(), "evidence assembly recorded data issues");
        }
        Ok(Self { slots, issues })
    }

    pub fn get(&self, gene_id: &str, layer: EvidenceLayer) -> Option<f64> {
        self.slots.get(gene_id).and_then(|s| s[layer.index()])
    }

    /// All six slots for one gene, in canonical layer order.
    pub fn gene_slots(&self, gene_id: &str) -> Option<&[Option<f64>; EvidenceLayer::COUNT]> {
        self.slots.get(gene_id)
    }

    /// Number of genes in the matrix (the universe size).
    pub fn n_genes(&self) -> usize {
        self.slots.len()
    }

    /// Number of genes with a present score in `layer`.
    pub fn present_count(&self, layer: EvidenceLayer) -> usize {
        let idx = layer.index();
        self.slots.values().filter(|s| s[idx].is_some()).count()
    }

    pub fn issues(&self) -> &[DataIssue] {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use generank_common::entities::EvidenceRow;

    fn universe() -> Vec<GeneRecord> {
        vec![
            GeneRecord { primary_id: "G1".into(), symbol: "ABC1".into() },
            GeneRecord { primary_id: "G2".into(), symbol: "DEF2".into() },
        ]
    }

    fn table(layer: EvidenceLayer, rows: Vec<(&str, Option<f64>)>) -> LayerTable {
        LayerTable {
            layer,
            rows: rows
                .into_iter()
                .map(|(id, score)| EvidenceRow { gene_id: id.into(), score })
                .collect(),
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let tables = vec![table(
            EvidenceLayer::Literature,
            vec![("G1", Some(0.8)), ("G2", None)],
        )];
        let matrix = EvidenceMatrix::build(&universe(), &tables).unwrap();
        assert_eq!(matrix.get("G1", EvidenceLayer::Literature), Some(0.8));
        assert_eq!(matrix.get("G2", EvidenceLayer::Literature), None);
        assert_eq!(matrix.present_count(EvidenceLayer::Literature), 1);
        assert!(matrix.issues().is_empty());
    }

    #[test]
    fn test_out_of_range_score_recorded_and_excluded() {
        let tables = vec![table(EvidenceLayer::Literature, vec![("G1", Some(1.5))])];
        let matrix = EvidenceMatrix::build(&universe(), &tables).unwrap();
        assert_eq!(matrix.get("G1", EvidenceLayer::Literature), None);
        assert_eq!(matrix.issues().len(), 1);
    }

    #[test]
    fn test_unknown_gene_recorded_and_skipped() {
        let tables = vec![table(EvidenceLayer::Literature, vec![("GX", Some(0.5))])];
        let matrix = EvidenceMatrix::build(&universe(), &tables).unwrap();
        assert_eq!(matrix.issues().len(), 1);
        assert_eq!(matrix.present_count(EvidenceLayer::Literature), 0);
    }

    #[test]
    fn test_duplicate_layer_table_rejected() {
        let tables = vec![
            table(EvidenceLayer::Literature, vec![]),
            table(EvidenceLayer::Literature, vec![]),
        ];
        let err = EvidenceMatrix::build(&universe(), &tables).unwrap_err();
        assert!(matches!(err, GenerankError::Config(_)));
    }

    #[test]
    fn test_duplicate_row_keeps_first() {
        let tables = vec![table(
            EvidenceLayer::Literature,
            vec![("G1", Some(0.3)), ("G1", Some(0.9))],
        )];
        let matrix = EvidenceMatrix::build(&universe(), &tables).unwrap();
        assert_eq!(matrix.get("G1", EvidenceLayer::Literature), Some(0.3));
        assert_eq!(matrix.issues().len(), 1);
    }
}
