//! Ranking primitives shared by control validation and sensitivity
//! analysis. Both directions of control checking use the same percentile
//! function; that symmetry is part of the validation contract.

use std::collections::BTreeMap;

use generank_common::stats::average_ranks;

use crate::scorer::CompositeScoreRecord;

/// Percentile rank for every scored gene: the fraction of scored genes
/// with an equal-or-lower composite score, tied scores sharing the average
/// rank position. Genes with a NULL score are excluded.
pub fn percentile_ranks(records: &[CompositeScoreRecord]) -> BTreeMap<String, f64> {
    let scored: Vec<(&str, f64)> = records
        .iter()
        .filter_map(|r| r.composite_score.map(|s| (r.gene_id.as_str(), s)))
        .collect();
    if scored.is_empty() {
        return BTreeMap::new();
    }

    let values: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();
    let ranks = average_ranks(&values);
    let n = scored.len() as f64;

    scored
        .iter()
        .zip(ranks.iter())
        .map(|((id, _), rank)| ((*id).to_string(), rank / n))
        .collect()
}

/// Gene ids of the top `n` scored genes, ordered by descending composite
/// score with ties broken by ascending gene id so the cut is deterministic.
pub fn top_n(records: &[CompositeScoreRecord], n: usize) -> Vec<String> {
    let mut scored: Vec<(&str, f64)> = records
        .iter()
        .filter_map(|r| r.composite_score.map(|s| (r.gene_id.as_str(), s)))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    scored.truncate(n);
    scored.into_iter().map(|(id, _)| id.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::QualityFlag;

    fn record(id: &str, score: Option<f64>) -> CompositeScoreRecord {
        CompositeScoreRecord {
            gene_id: id.into(),
            symbol: id.into(),
            composite_score: score,
            evidence_count: u8::from(score.is_some()),
            quality_flag: QualityFlag::Sparse,
            contributions: BTreeMap::new(),
        }
    }

    #[test]
    fn test_percentiles_basic() {
        let records = vec![
            record("G1", Some(0.1)),
            record("G2", Some(0.5)),
            record("G3", Some(0.9)),
        ];
        let p = percentile_ranks(&records);
        assert!((p["G1"] - 1.0 / 3.0).abs() < 1e-12);
        assert!((p["G2"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p["G3"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentiles_ties_share_average() {
        let records = vec![
            record("G1", Some(0.5)),
            record("G2", Some(0.5)),
            record("G3", Some(0.9)),
            record("G4", Some(0.1)),
        ];
        let p = percentile_ranks(&records);
        // G1/G2 tie for ranks 2 and 3 → average rank 2.5 → 0.625
        assert!((p["G1"] - 0.625).abs() < 1e-12);
        assert!((p["G2"] - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_null_scores_excluded() {
        let records = vec![record("G1", Some(0.5)), record("G2", None)];
        let p = percentile_ranks(&records);
        assert!(p.contains_key("G1"));
        assert!(!p.contains_key("G2"));
    }

    #[test]
    fn test_top_n_deterministic_ties() {
        let records = vec![
            record("G3", Some(0.5)),
            record("G1", Some(0.5)),
            record("G2", Some(0.9)),
        ];
        let top = top_n(&records, 2);
        assert_eq!(top, vec!["G2".to_string(), "G1".to_string()]);
    }

    #[test]
    fn test_top_n_larger_than_population() {
        let records = vec![record("G1", Some(0.5)), record("G2", None)];
        let top = top_n(&records, 10);
        assert_eq!(top, vec!["G1".to_string()]);
    }
}
