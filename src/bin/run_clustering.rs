// src/bin/run_clustering.rs
//
// Scans the candidate group counts for the configured input and logs the
// score table. Writes no files.

use anyhow::{Context, Result};
use env_logger::Env;
use log::info;
use std::time::Instant;

use track_lib::clustering::model_order::CandidateOutcome;
use track_lib::clustering::normalizer::standardize;
use track_lib::clustering::select_model_order;
use track_lib::input::load_working_set;
use track_lib::utils::analysis_config::AnalysisConfig;
use track_lib::utils::env::load_env;
use track_lib::utils::progress_config::ProgressConfig;

fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    load_env();

    let config = AnalysisConfig::from_env();
    config.validate().context("Invalid analysis configuration")?;
    config.log_config();
    let progress_config = ProgressConfig::from_env();

    let start = Instant::now();
    let working = load_working_set(&config.input_path)
        .with_context(|| format!("Failed to load {}", config.input_path.display()))?;
    let (_, scaled) = standardize(working.raw.view()).context("Failed to standardise features")?;

    let selection = select_model_order(
        scaled.view(),
        &config.model_order_config(),
        progress_config.create_multi_progress(),
    )
    .context("Model-order scan failed")?;

    info!("=== Model-Order Scan ===");
    info!("{:>4}  {:>10}  {:>12}", "k", "silhouette", "inertia");
    for evaluation in &selection.evaluations {
        match &evaluation.outcome {
            CandidateOutcome::Scored { score, inertia } => {
                info!("{:>4}  {:>10.4}  {:>12.3}", evaluation.k, score, inertia)
            }
            CandidateOutcome::Rejected { reason } => {
                info!("{:>4}  {:>10}  {}", evaluation.k, "-", reason)
            }
        }
    }
    info!(
        "👉 Best k = {} (silhouette={:.3}) over {} records in {:.2?}",
        selection.k,
        selection.score,
        working.len(),
        start.elapsed()
    );
    Ok(())
}
