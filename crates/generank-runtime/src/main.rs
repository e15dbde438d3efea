//! generank — Gene prioritization scoring and validation engine.
//! Entry point for the pipeline binary.

mod bundle;

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use generank_common::run_config::RunConfig;
use generank_scoring::evidence::EvidenceMatrix;
use generank_scoring::qc::run_qc;
use generank_scoring::scorer::{collapse_by_symbol, score};
use generank_scoring::tiering::{classify, Tier};
use generank_scoring::weights::LayerWeights;
use generank_validation::controls::{validate_negative, validate_positive};
use generank_validation::report::{build_report, TierCounts};
use generank_validation::sensitivity::analyze;

use bundle::EvidenceBundle;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("generank v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(bundle_path)) = (args.next(), args.next()) else {
        bail!("usage: generank <config.{{yaml|json|toml}}> <evidence_bundle.json> [out_dir]");
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    // Configuration errors abort here, before anything is scored.
    let config = RunConfig::load(&config_path)
        .with_context(|| format!("loading run configuration from {config_path}"))?;
    let weights = LayerWeights::from_config(&config.weights)?;
    info!("Configuration loaded and validated.");

    let bundle = EvidenceBundle::load(std::path::Path::new(&bundle_path))
        .with_context(|| format!("loading evidence bundle from {bundle_path}"))?;
    info!(
        genes = bundle.genes.len(),
        layers = bundle.layers.len(),
        "Evidence bundle loaded."
    );

    let tables = bundle.layer_tables();
    let matrix = EvidenceMatrix::build(&bundle.genes, &tables)?;
    if !matrix.issues().is_empty() {
        info!(issues = matrix.issues().len(), "Data issues recorded during assembly.");
    }

    let records = score(&bundle.genes, &matrix, &weights, &config.quality)?;
    let records = collapse_by_symbol(records);
    info!(records = records.len(), "Composite scoring complete.");

    let mut tier_counts = TierCounts::default();
    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let tier = classify(record, &config.tiers);
        match tier {
            Tier::High => tier_counts.high += 1,
            Tier::Medium => tier_counts.medium += 1,
            Tier::Low => tier_counts.low += 1,
        }
        rows.push(serde_json::json!({
            "gene_id": record.gene_id,
            "symbol": record.symbol,
            "composite_score": record.composite_score,
            "evidence_count": record.evidence_count,
            "quality_flag": record.quality_flag,
            "tier": tier,
            "contributions": record.contributions,
        }));
    }
    info!(
        high = tier_counts.high,
        medium = tier_counts.medium,
        low = tier_counts.low,
        "Tiering complete."
    );

    let qc = run_qc(&records, &matrix, &config.qc);
    let positive = validate_positive(&records, &bundle.positive_controls, &config.controls);
    let negative = validate_negative(
        &records,
        &bundle.negative_controls,
        &config.controls,
        &config.tiers,
    );
    let sensitivity = analyze(
        &bundle.genes,
        &matrix,
        &weights,
        &config.quality,
        &config.sensitivity,
    )?;

    let report = build_report(
        qc,
        tier_counts,
        positive,
        negative,
        sensitivity,
        matrix.issues(),
    );
    info!(verdict = ?report.verdict, "Validation complete.");

    std::fs::create_dir_all(&out_dir)?;
    let scores_path = out_dir.join("composite_scores.json");
    std::fs::write(&scores_path, serde_json::to_string_pretty(&rows)?)?;
    let report_json_path = out_dir.join("validation_report.json");
    std::fs::write(&report_json_path, serde_json::to_string_pretty(&report)?)?;
    let report_md_path = out_dir.join("validation_report.md");
    std::fs::write(&report_md_path, report.render_markdown())?;

    info!(
        scores = %scores_path.display(),
        report = %report_json_path.display(),
        "Outputs written."
    );
    Ok(())
}
