//! generank-validation — Control validation, weight-sensitivity analysis,
//! and the aggregated validation report.

pub mod controls;
pub mod sensitivity;
pub mod report;

pub use controls::{
    validate_negative, validate_positive, CheckOutcome, NegativeControlReport,
    PositiveControlReport,
};
pub use report::{build_report, ValidationReport, Verdict};
pub use sensitivity::{analyze, SensitivityResult, SensitivitySummary, Stability};
