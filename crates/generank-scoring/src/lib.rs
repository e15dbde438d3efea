//! generank-scoring — Composite scoring engine, quality control, and tiering.

pub mod weights;
pub mod evidence;
pub mod scorer;
pub mod tiering;
pub mod ranking;
pub mod qc;

pub use evidence::{DataIssue, EvidenceMatrix};
pub use scorer::{collapse_by_symbol, score, CompositeScoreRecord, QualityFlag};
pub use tiering::{classify, Tier};
pub use weights::LayerWeights;
