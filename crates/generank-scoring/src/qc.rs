//! Quality-control diagnostics over the composite output.
//!
//! QC never blocks the pipeline; every finding here is advisory and lands
//! in the validation report.

use serde::{Deserialize, Serialize};
use tracing::debug;

use generank_common::layers::EvidenceLayer;
use generank_common::run_config::QcConfig;
use generank_common::stats::{self, MAD_CONSISTENCY};

use crate::evidence::EvidenceMatrix;
use crate::scorer::CompositeScoreRecord;

/// Per-layer coverage diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerQc {
    pub layer: EvidenceLayer,
    pub n_present: usize,
    /// Fraction of universe genes with no score in this layer.
    pub missing_rate: f64,
}

/// Shape of the composite-score distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub n_scored: usize,
    pub n_null: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlier {
    pub gene_id: String,
    pub score: f64,
    /// |score - median|, in score units.
    pub deviation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcReport {
    pub layers: Vec<LayerQc>,
    pub composite: DistributionSummary,
    /// 1.4826 * MAD of the composite distribution; `None` when fewer than
    /// two genes were scored or the distribution is degenerate.
    pub scaled_mad: Option<f64>,
    pub outliers: Vec<Outlier>,
}

/// Compute layer coverage and composite-distribution diagnostics.
/// A score is an outlier when |score - median| > multiplier * 1.4826 * MAD.
pub fn run_qc(
    records: &[CompositeScoreRecord],
    matrix: &EvidenceMatrix,
    config: &QcConfig,
) -> QcReport {
    let n_genes = matrix.n_genes();
    let layers = EvidenceLayer::ALL
        .iter()
        .map(|&layer| {
            let n_present = matrix.present_count(layer);
            LayerQc {
                layer,
                n_present,
                missing_rate: if n_genes == 0 {
                    0.0
                } else {
                    1.0 - n_present as f64 / n_genes as f64
                },
            }
        })
        .collect();

    let scored: Vec<(&str, f64)> = records
        .iter()
        .filter_map(|r| r.composite_score.map(|s| (r.gene_id.as_str(), s)))
        .collect();
    let values: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();

    let composite = DistributionSummary {
        n_scored: values.len(),
        n_null: records.len() - values.len(),
        min: values.iter().copied().min_by(|a, b| a.total_cmp(b)),
        max: values.iter().copied().max_by(|a, b| a.total_cmp(b)),
        mean: stats::mean(&values),
        median: stats::median(&values),
        std_dev: stats::std_dev(&values),
    };

    let scaled_mad = stats::mad(&values)
        .map(|m| m * MAD_CONSISTENCY)
        .filter(|m| *m > 0.0);

    let outliers = match (composite.median, scaled_mad) {
        (Some(med), Some(smad)) => {
            let cutoff = config.mad_multiplier * smad;
            scored
                .iter()
                .filter_map(|(id, s)| {
                    let deviation = (s - med).abs();
                    (deviation > cutoff).then(|| Outlier {
                        gene_id: (*id).to_string(),
                        score: *s,
                        deviation,
                    })
                })
                .collect()
        }
        // Degenerate distribution (e.g. all scores identical): no cutoff
        // to measure against.
        _ => Vec::new(),
    };

    debug!(
        outliers = outliers.len(),
        n_scored = composite.n_scored,
        "qc complete"
    );
    QcReport { layers, composite, scaled_mad, outliers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use generank_common::entities::{EvidenceRow, GeneRecord, LayerTable};
    use generank_common::run_config::{QualityConfig, WeightsConfig};

    use crate::scorer::score;
    use crate::weights::LayerWeights;

    fn setup(scores: &[(&str, f64)]) -> (Vec<CompositeScoreRecord>, EvidenceMatrix) {
        let universe: Vec<GeneRecord> = scores
            .iter()
            .map(|(id, _)| GeneRecord { primary_id: (*id).into(), symbol: (*id).into() })
            .collect();
        let tables = vec![LayerTable {
            layer: EvidenceLayer::Literature,
            rows: scores
                .iter()
                .map(|(id, s)| EvidenceRow { gene_id: (*id).into(), score: Some(*s) })
                .collect(),
        }];
        let matrix = EvidenceMatrix::build(&universe, &tables).unwrap();
        let weights = LayerWeights::from_config(&WeightsConfig::default()).unwrap();
        let records = score(&universe, &matrix, &weights, &QualityConfig::default()).unwrap();
        (records, matrix)
    }

    #[test]
    fn test_missing_rates() {
        let (records, matrix) = setup(&[("G1", 0.5), ("G2", 0.6)]);
        let report = run_qc(&records, &matrix, &QcConfig::default());
        let lit = report
            .layers
            .iter()
            .find(|l| l.layer == EvidenceLayer::Literature)
            .unwrap();
        assert_eq!(lit.missing_rate, 0.0);
        let constraint = report
            .layers
            .iter()
            .find(|l| l.layer == EvidenceLayer::GeneticConstraint)
            .unwrap();
        assert_eq!(constraint.missing_rate, 1.0);
    }

    #[test]
    fn test_outlier_detection() {
        // Tight cluster with one far point.
        let scores: Vec<(String, f64)> = (0..20)
            .map(|i| (format!("G{i:02}"), 0.50 + 0.001 * i as f64))
            .chain(std::iter::once(("G99".to_string(), 0.99)))
            .collect();
        let refs: Vec<(&str, f64)> = scores.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        let (records, matrix) = setup(&refs);
        let report = run_qc(&records, &matrix, &QcConfig::default());
        assert!(report.outliers.iter().any(|o| o.gene_id == "G99"));
        assert!(!report.outliers.iter().any(|o| o.gene_id == "G05"));
    }

    #[test]
    fn test_degenerate_distribution_has_no_outliers() {
        let (records, matrix) = setup(&[("G1", 0.5), ("G2", 0.5), ("G3", 0.5)]);
        let report = run_qc(&records, &matrix, &QcConfig::default());
        assert!(report.scaled_mad.is_none());
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let (records, matrix) = setup(&[("G1", 0.2), ("G2", 0.8)]);
        let report = run_qc(&records, &matrix, &QcConfig::default());
        assert_eq!(report.composite.n_scored, 2);
        assert_eq!(report.composite.n_null, 0);
        assert_eq!(report.composite.mean, Some(0.5));
    }
}
