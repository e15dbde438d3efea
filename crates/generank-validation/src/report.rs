//! Aggregated validation report.
//!
//! Pulls QC, tiering, control validation, and sensitivity into one
//! structured document with an explicit verdict decision table and
//! non-binding weight-tuning guidance. Every recommendation carries the
//! circularity warning: tuning weights against the same controls used to
//! validate them invalidates the validation.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use generank_common::layers::EvidenceLayer;
use generank_scoring::evidence::DataIssue;
use generank_scoring::qc::QcReport;

use crate::controls::{CheckOutcome, NegativeControlReport, PositiveControlReport};
use crate::sensitivity::SensitivitySummary;

pub const CIRCULARITY_WARNING: &str = "Tuning weights against the same control sets used to \
     validate them is circular and invalidates this validation; any adjusted configuration \
     requires independent re-validation against held-out controls.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Partial,
    Fail,
}

/// Tier population counts over the final composite table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Non-binding guidance keyed to a failed check. Never applied
/// automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightRecommendation {
    pub layer: Option<EvidenceLayer>,
    /// "increase" or "decrease".
    pub action: String,
    pub reason: String,
    pub caveat: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub qc: QcReport,
    pub tier_counts: TierCounts,
    pub positive: PositiveControlReport,
    pub negative: NegativeControlReport,
    pub sensitivity: SensitivitySummary,
    /// Data errors and statistical indeterminacies surfaced as caveats
    /// rather than aborting the run.
    pub caveats: Vec<String>,
    pub recommendations: Vec<WeightRecommendation>,
}

/// Assemble the report and apply the verdict decision table:
/// positive FAIL → FAIL; all three checks PASS → PASS; anything else
/// (including indeterminate checks) → PARTIAL.
pub fn build_report(
    qc: QcReport,
    tier_counts: TierCounts,
    positive: PositiveControlReport,
    negative: NegativeControlReport,
    sensitivity: SensitivitySummary,
    data_issues: &[DataIssue],
) -> ValidationReport {
    let verdict = if positive.outcome == CheckOutcome::Fail {
        Verdict::Fail
    } else if positive.outcome == CheckOutcome::Pass
        && negative.outcome == CheckOutcome::Pass
        && sensitivity.outcome == CheckOutcome::Pass
    {
        Verdict::Pass
    } else {
        Verdict::Partial
    };

    let caveats = collect_caveats(&positive, &negative, &sensitivity, data_issues);
    let recommendations = recommend(&positive, &negative, &sensitivity);

    ValidationReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        verdict,
        qc,
        tier_counts,
        positive,
        negative,
        sensitivity,
        caveats,
        recommendations,
    }
}

fn collect_caveats(
    positive: &PositiveControlReport,
    negative: &NegativeControlReport,
    sensitivity: &SensitivitySummary,
    data_issues: &[DataIssue],
) -> Vec<String> {
    let mut caveats = Vec::new();
    if !data_issues.is_empty() {
        caveats.push(format!(
            "{} evidence rows were excluded as data errors (out-of-range scores or genes \
             outside the universe); see the composite table diagnostics.",
            data_issues.len()
        ));
    }
    if !positive.missing.is_empty() {
        caveats.push(format!(
            "{} of {} positive-control genes are absent from the scored population: {}",
            positive.missing.len(),
            positive.n_expected,
            positive.missing.join(", ")
        ));
    }
    if !negative.missing.is_empty() {
        caveats.push(format!(
            "{} of {} negative-control genes are absent from the scored population: {}",
            negative.missing.len(),
            negative.n_expected,
            negative.missing.join(", ")
        ));
    }
    if positive.outcome == CheckOutcome::Indeterminate {
        caveats.push(
            "Positive-control check is indeterminate: no control genes were found in the \
             scored population."
                .into(),
        );
    }
    if negative.outcome == CheckOutcome::Indeterminate {
        caveats.push(
            "Negative-control check is indeterminate: no control genes were found in the \
             scored population."
                .into(),
        );
    }
    if sensitivity.indeterminate_count > 0 {
        caveats.push(format!(
            "{} sensitivity perturbations had insufficient top-N overlap for a correlation \
             and are excluded from stability tallies.",
            sensitivity.indeterminate_count
        ));
    }
    caveats.push(
        "Spearman p-values are asymptotic approximations and unreliable below a few hundred \
         observations; they are advisory and never gate pass/fail."
            .into(),
    );
    caveats
}

fn recommend(
    positive: &PositiveControlReport,
    negative: &NegativeControlReport,
    sensitivity: &SensitivitySummary,
) -> Vec<WeightRecommendation> {
    let mut recs = Vec::new();

    if negative.outcome == CheckOutcome::Fail {
        recs.push(WeightRecommendation {
            layer: negative.dominant_layer,
            action: "decrease".into(),
            reason: match negative.dominant_layer {
                Some(layer) => format!(
                    "Negative controls rank too high (median percentile {:.2} >= {:.2}); \
                     the {layer} layer contributes most to their scores.",
                    negative.median_percentile.unwrap_or(f64::NAN),
                    negative.threshold
                ),
                None => "Negative controls rank too high but no single layer dominates \
                         their scores."
                    .into(),
            },
            caveat: CIRCULARITY_WARNING.into(),
        });
    }

    if positive.outcome == CheckOutcome::Fail {
        recs.push(WeightRecommendation {
            layer: positive.dominant_layer,
            action: "increase".into(),
            reason: match positive.dominant_layer {
                Some(layer) => format!(
                    "Positive controls rank too low (median percentile {:.2} < {:.2}); \
                     the {layer} layer carries their strongest signal and may be \
                     underweighted.",
                    positive.median_percentile.unwrap_or(f64::NAN),
                    positive.threshold
                ),
                None => "Positive controls rank too low and no single layer carries \
                         their signal."
                    .into(),
            },
            caveat: CIRCULARITY_WARNING.into(),
        });
    }

    if sensitivity.outcome == CheckOutcome::Fail {
        recs.push(WeightRecommendation {
            layer: sensitivity.most_sensitive,
            action: "decrease".into(),
            reason: format!(
                "{} of {} perturbations fell below the stability threshold {:.2}; the \
                 ranking is most sensitive to {} weight changes.",
                sensitivity.unstable_count,
                sensitivity.results.len(),
                sensitivity.stability_threshold,
                sensitivity
                    .most_sensitive
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "per-layer".into())
            ),
            caveat: CIRCULARITY_WARNING.into(),
        });
    }

    recs
}

impl ValidationReport {
    /// Render the structured report as a human-readable document.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Gene prioritization validation report\n");
        let _ = writeln!(out, "- Run: `{}`", self.run_id);
        let _ = writeln!(out, "- Generated: {}", self.generated_at.to_rfc3339());
        let _ = writeln!(out, "- **Verdict: {:?}**\n", self.verdict);

        let _ = writeln!(out, "## Quality control\n");
        let _ = writeln!(out, "| layer | present | missing rate |");
        let _ = writeln!(out, "|---|---|---|");
        for layer in &self.qc.layers {
            let _ = writeln!(
                out,
                "| {} | {} | {:.1}% |",
                layer.layer,
                layer.n_present,
                layer.missing_rate * 100.0
            );
        }
        let c = &self.qc.composite;
        let _ = writeln!(
            out,
            "\nComposite distribution: {} scored, {} null; median {}, MAD-scaled {}; \
             {} outliers.\n",
            c.n_scored,
            c.n_null,
            fmt_opt(c.median),
            fmt_opt(self.qc.scaled_mad),
            self.qc.outliers.len()
        );

        let _ = writeln!(out, "## Tiers\n");
        let _ = writeln!(
            out,
            "HIGH: {} MEDIUM: {} LOW: {}\n",
            self.tier_counts.high, self.tier_counts.medium, self.tier_counts.low
        );

        let _ = writeln!(out, "## Positive controls\n");
        let _ = writeln!(
            out,
            "Outcome: {:?} (median percentile {} vs threshold {:.2}; {}/{} found)\n",
            self.positive.outcome,
            fmt_opt(self.positive.median_percentile),
            self.positive.threshold,
            self.positive.n_found,
            self.positive.n_expected
        );
        let _ = writeln!(out, "| k | found | recall |");
        let _ = writeln!(out, "|---|---|---|");
        for r in &self.positive.recall {
            let _ = writeln!(out, "| {} | {} | {} |", r.k, r.found, fmt_opt(r.recall));
        }
        let _ = writeln!(out, "\nPer source:");
        for s in &self.positive.per_source {
            let recall = s
                .recall
                .iter()
                .map(|r| format!("@{} {}", r.k, fmt_opt(r.recall)))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "- {} ({}): {}/{} found, median percentile {}, recall {}",
                s.name,
                s.source,
                s.n_found,
                s.n_expected,
                fmt_opt(s.median_percentile),
                if recall.is_empty() { "n/a".to_string() } else { recall }
            );
        }

        let _ = writeln!(out, "\n## Negative controls\n");
        let _ = writeln!(
            out,
            "Outcome: {:?} (median percentile {} vs threshold {:.2}; {}/{} found; {} in top \
             quartile; {} in HIGH tier)\n",
            self.negative.outcome,
            fmt_opt(self.negative.median_percentile),
            self.negative.threshold,
            self.negative.n_found,
            self.negative.n_expected,
            self.negative.top_quartile_count,
            self.negative.high_tier_count
        );

        let _ = writeln!(out, "## Sensitivity\n");
        let _ = writeln!(
            out,
            "Outcome: {:?} — rho min {} mean {} max {}; {} stable / {} unstable / {} \
             indeterminate (threshold {:.2})",
            self.sensitivity.outcome,
            fmt_opt(self.sensitivity.min_rho),
            fmt_opt(self.sensitivity.mean_rho),
            fmt_opt(self.sensitivity.max_rho),
            self.sensitivity.stable_count,
            self.sensitivity.unstable_count,
            self.sensitivity.indeterminate_count,
            self.sensitivity.stability_threshold
        );
        if let (Some(s), Some(r)) =
            (self.sensitivity.most_sensitive, self.sensitivity.most_robust)
        {
            let _ = writeln!(out, "Most sensitive layer: {s}; most robust layer: {r}");
        }

        if !self.caveats.is_empty() {
            let _ = writeln!(out, "\n## Caveats\n");
            for caveat in &self.caveats {
                let _ = writeln!(out, "- {caveat}");
            }
        }

        if !self.recommendations.is_empty() {
            let _ = writeln!(out, "\n## Weight-tuning guidance (non-binding)\n");
            for rec in &self.recommendations {
                let layer = rec
                    .layer
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "(no single layer)".into());
                let _ = writeln!(out, "- {} `{}`: {}", rec.action, layer, rec.reason);
                let _ = writeln!(out, "  - **Warning:** {}", rec.caveat);
            }
        }

        out
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.4}"),
        None => "n/a".into(),
    }
}
