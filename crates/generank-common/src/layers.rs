//! The closed enumeration of evidence layers.
//!
//! Every weight table, evidence lookup, and report iterates layers in
//! [`EvidenceLayer::ALL`] order so that floating-point summation order is
//! identical across runs. Adding or removing a layer is a compile-time
//! change that propagates through weights, scoring, and reporting.

use serde::{Deserialize, Serialize};

use crate::error::{GenerankError, Result};

/// One of the six independent evidence sources contributing a per-gene
/// score in [0, 1] (or no score at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceLayer {
    /// Population genetic constraint (intolerance to loss of function).
    GeneticConstraint,
    /// Tissue-level expression profile.
    TissueExpression,
    /// Protein domain/feature annotation.
    ProteinFeatures,
    /// Subcellular localization evidence.
    SubcellularLocalization,
    /// Animal-model phenotype associations.
    ModelPhenotype,
    /// Literature and annotation depth.
    Literature,
}

impl EvidenceLayer {
    /// Canonical iteration order. All deterministic arithmetic walks this.
    pub const ALL: [EvidenceLayer; 6] = [
        EvidenceLayer::GeneticConstraint,
        EvidenceLayer::TissueExpression,
        EvidenceLayer::ProteinFeatures,
        EvidenceLayer::SubcellularLocalization,
        EvidenceLayer::ModelPhenotype,
        EvidenceLayer::Literature,
    ];

    pub const COUNT: usize = 6;

    /// Position in [`Self::ALL`]; used to index weight/score arrays.
    pub fn index(&self) -> usize {
        match self {
            EvidenceLayer::GeneticConstraint       => 0,
            EvidenceLayer::TissueExpression        => 1,
            EvidenceLayer::ProteinFeatures         => 2,
            EvidenceLayer::SubcellularLocalization => 3,
            EvidenceLayer::ModelPhenotype          => 4,
            EvidenceLayer::Literature              => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceLayer::GeneticConstraint       => "genetic_constraint",
            EvidenceLayer::TissueExpression        => "tissue_expression",
            EvidenceLayer::ProteinFeatures         => "protein_features",
            EvidenceLayer::SubcellularLocalization => "subcellular_localization",
            EvidenceLayer::ModelPhenotype          => "model_phenotype",
            EvidenceLayer::Literature              => "literature",
        }
    }

    /// Parse a layer name. Unknown names are a configuration error, never
    /// silently ignored.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "genetic_constraint"       => Ok(EvidenceLayer::GeneticConstraint),
            "tissue_expression"        => Ok(EvidenceLayer::TissueExpression),
            "protein_features"         => Ok(EvidenceLayer::ProteinFeatures),
            "subcellular_localization" => Ok(EvidenceLayer::SubcellularLocalization),
            "model_phenotype"          => Ok(EvidenceLayer::ModelPhenotype),
            "literature"               => Ok(EvidenceLayer::Literature),
            other => Err(GenerankError::Config(format!(
                "unknown evidence layer name: {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for EvidenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
