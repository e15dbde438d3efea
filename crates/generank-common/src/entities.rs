/// Core entity types shared by the scoring and validation crates.
/// These mirror the tables the external evidence store materializes.

use serde::{Deserialize, Serialize};

use crate::layers::EvidenceLayer;

// ---------------------------------------------------------------------------
// Gene universe
// ---------------------------------------------------------------------------

/// One gene in the universe. Immutable once loaded.
///
/// `primary_id` is the stable genome-database identifier; `symbol` is the
/// human-readable name. Multiple primary ids may share a symbol — the
/// scoring crate collapses those to one canonical record per symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub primary_id: String,
    pub symbol: String,
}

// ---------------------------------------------------------------------------
// Evidence tables (read-only input from the retrieval layer)
// ---------------------------------------------------------------------------

/// One row of a per-layer evidence table. `score` is `None` when the layer
/// did not measure this gene — "not measured", never "measured as zero".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub gene_id: String,
    pub score: Option<f64>,
}

/// A complete evidence table for one layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerTable {
    pub layer: EvidenceLayer,
    pub rows: Vec<EvidenceRow>,
}

// ---------------------------------------------------------------------------
// Control sets
// ---------------------------------------------------------------------------

/// A named set of gene symbols compiled from static reference data, used
/// as positive controls (expected to rank high) or negative controls
/// (expected to rank low). Polarity is decided by which argument slot the
/// set is passed in, so both directions share one type and one ranking
/// primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSet {
    /// Short name used in per-source breakdowns.
    pub name: String,
    /// Provenance tag (e.g. "clingen_definitive", "hrt_atlas_housekeeping").
    pub source: String,
    pub symbols: Vec<String>,
}

impl ControlSet {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        symbols: Vec<String>,
    ) -> Self {
        Self { name: name.into(), source: source.into(), symbols }
    }
}
