use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use indicatif::ProgressBar;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use track_lib::export::store;
use track_lib::input::load_working_set;
use track_lib::models::stats_models::PipelineStats;
use track_lib::pipeline::{export_artifacts, remove_artifacts, run_core};
use track_lib::utils::analysis_config::AnalysisConfig;
use track_lib::utils::env::load_env;
use track_lib::utils::get_memory_usage;
use track_lib::utils::progress_config::{main_bar, ProgressConfig};
use track_lib::utils::store_config::StoreConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input CSV (overrides INPUT_CSV)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for charts and tables (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Clustering seed (overrides CLUSTER_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the PostgreSQL store (flat files only)
    #[arg(long)]
    no_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    info!("Starting track clustering analysis");
    load_env();
    let args = Args::parse();

    let mut config = AnalysisConfig::from_env();
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("Invalid analysis configuration")?;
    config.log_config();

    let mut store_config = StoreConfig::from_env();
    if args.no_store {
        store_config.enabled = false;
    }
    store_config.log_config();
    // Connect before any work so an unreachable store fails the run early.
    let pool = if store_config.enabled {
        store::validate_identifier(&store_config.table).context("Invalid STORE_TABLE")?;
        Some(store::connect().await.context("Failed to connect to database")?)
    } else {
        None
    };

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );
    let multi_progress = progress_config.create_multi_progress();
    let phase_count = if pool.is_some() { 4 } else { 3 };
    let main_pb: Option<ProgressBar> = multi_progress.as_ref().map(|mp| mp.add(main_bar(phase_count)));

    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now().naive_utc();
    let mut stats = PipelineStats::new(
        run_id.clone(),
        run_timestamp,
        Some(format!("Clustering run with seed {}", config.seed)),
        config.input_path.display().to_string(),
    );
    let run_start = Instant::now();

    // Phase 1: load and clean
    if let Some(pb) = &main_pb {
        pb.set_message("Phase 1: Loading tracks");
    }
    let phase1_start = Instant::now();
    let working = load_working_set(&config.input_path)
        .with_context(|| format!("Failed to load {}", config.input_path.display()))?;
    stats.loaded_rows = working.loaded_rows;
    stats.duplicate_rows = working.duplicate_rows;
    stats.incomplete_rows = working.incomplete_rows;
    stats.working_rows = working.len();
    let phase1_duration = phase1_start.elapsed();
    stats.load_time = phase1_duration.as_secs_f64();
    info!(
        "Phase 1 completed: {} rows loaded, {} duplicates, {} incomplete, {} in working set",
        stats.loaded_rows, stats.duplicate_rows, stats.incomplete_rows, stats.working_rows
    );
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 2: clustering core
    if let Some(pb) = &main_pb {
        pb.set_message("Phase 2: Clustering");
    }
    let phase2_start = Instant::now();
    let outcome = run_core(
        working,
        &config,
        progress_config.detailed_progress(&multi_progress),
    )
    .context("Clustering analysis failed")?;
    stats.selected_k = outcome.selection.k;
    stats.silhouette = outcome.selection.score;
    stats.cluster_counts = outcome.assignment.counts();
    let phase2_duration = phase2_start.elapsed();
    stats.clustering_time = phase2_duration.as_secs_f64();
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 3: store rows and flat-file artifacts, committed together
    if let Some(pb) = &main_pb {
        pb.set_message("Phase 3: Writing results");
    }
    let phase3_start = Instant::now();
    let produced = match &pool {
        Some(pool) => {
            let mut conn = pool
                .get()
                .await
                .context("Failed to get DB connection for results")?;
            let transaction = conn
                .transaction()
                .await
                .context("Failed to start results transaction")?;
            let store_start = Instant::now();
            store::save_detail_rows(
                &transaction,
                &store_config.table,
                &outcome.base_column_names(),
                &outcome.working.features,
                &outcome.detail_rows,
            )
            .await
            .context("Failed to save clustered tracks")?;
            stats.total_processing_time = run_start.elapsed().as_secs_f64();
            store::record_run(&transaction, &stats, &store_config.table)
                .await
                .context("Failed to record run")?;
            stats.store_time = store_start.elapsed().as_secs_f64();

            // Dropping the transaction on an export error rolls the store back.
            let produced = export_artifacts(&outcome, &config.output_dir)
                .context("Failed to export analysis artifacts")?;
            if let Err(e) = transaction.commit().await {
                remove_artifacts(&produced);
                return Err(e).context("Failed to commit clustered tracks");
            }
            info!("Committed {} rows to {}", outcome.detail_rows.len(), store_config.table);
            produced
        }
        None => export_artifacts(&outcome, &config.output_dir)
            .context("Failed to export analysis artifacts")?,
    };
    let phase3_duration = phase3_start.elapsed();
    stats.export_time = phase3_duration.as_secs_f64() - stats.store_time;
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 4: report queries against the store
    let mut phase4_duration = None;
    if let Some(pool) = &pool {
        if let Some(pb) = &main_pb {
            pb.set_message("Phase 4: Store report");
        }
        let phase4_start = Instant::now();
        let base_columns = outcome.base_column_names();

        info!("--- Tracks per Cluster ---");
        for (name, count) in store::query_cluster_counts(pool, &store_config.table).await? {
            info!("  {:<20} {}", name, count);
        }
        if base_columns.contains(&"artist") && base_columns.contains(&"popularity") {
            info!("--- Top {} Artists by Avg Popularity ---", store_config.top_artists);
            for (artist, avg_pop) in
                store::query_top_artists(pool, &store_config.table, store_config.top_artists).await?
            {
                info!(
                    "  {:<30} {}",
                    artist.unwrap_or_else(|| "(unknown)".to_string()),
                    avg_pop.map(|p| format!("{:.2}", p)).unwrap_or_default()
                );
            }
        } else {
            warn!("Skipping top-artist query: artist or popularity column not present");
        }

        phase4_duration = Some(phase4_start.elapsed());
        if let Some(pb) = &main_pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &main_pb {
        pb.finish_with_message("Analysis complete");
    }
    stats.total_processing_time = run_start.elapsed().as_secs_f64();

    info!("=== Analysis Summary ===");
    info!("Run ID: {}", run_id);
    info!("Working records: {}", stats.working_rows);
    info!(
        "Selected k = {} (silhouette={:.3})",
        stats.selected_k, stats.silhouette
    );
    for profile in &outcome.profiles {
        info!(
            "  Cluster {} [{}]: {} tracks",
            profile.cluster, profile.name, profile.count
        );
    }
    info!("=== Timing Breakdown ===");
    info!("Phase 1 (Load & clean): {:.2?}", phase1_duration);
    info!("Phase 2 (Clustering): {:.2?}", phase2_duration);
    info!("Phase 3 (Store & export): {:.2?}", phase3_duration);
    if let Some(duration) = phase4_duration {
        info!("Phase 4 (Store report): {:.2?}", duration);
    }
    info!("Total execution time: {:.2}s", stats.total_processing_time);

    if progress_config.should_show_memory() {
        let final_memory_mb = get_memory_usage().await;
        info!("Final memory usage: {} MB", final_memory_mb);
    }

    info!("✅ Done! Created files:");
    for path in &produced {
        info!(" - {}", path.display());
    }
    if store_config.enabled {
        info!(" - PostgreSQL table {}", store_config.table);
    }
    Ok(())
}
