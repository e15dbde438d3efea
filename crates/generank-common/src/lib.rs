//! generank-common — Shared types, errors, and configuration used across all generank crates.

pub mod error;
pub mod layers;
pub mod entities;
pub mod run_config;
pub mod stats;

// Re-export commonly used types
pub use error::{GenerankError, Result};
pub use layers::EvidenceLayer;
pub use run_config::RunConfig;
