// src/pipeline.rs

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analysis::{pearson_matrix, CorrelationMatrix};
use crate::clustering::naming::group_means;
use crate::clustering::normalizer::standardize;
use crate::clustering::{
    assign_clusters, build_detail_rows, build_profiles, name_clusters, select_model_order,
    ClusterAssignment, ModelOrderSelection, NamingUnits,
};
use crate::errors::PipelineError;
use crate::export::{charts, tables};
use crate::export::{
    CLUSTERS_PCA_FILE, CORRELATIONS_FILE, DANCE_VS_POP_FILE, DETAIL_FILE, PROFILE_FILE,
};
use crate::models::{ClusterName, ClusterProfile, DetailRow, WorkingSet};
use crate::utils::analysis_config::AnalysisConfig;

/// Everything one run computes, ready for the exporters.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub working: WorkingSet,
    pub correlations: CorrelationMatrix,
    pub selection: ModelOrderSelection,
    pub assignment: ClusterAssignment,
    pub names: Vec<ClusterName>,
    pub profiles: Vec<ClusterProfile>,
    pub detail_rows: Vec<DetailRow>,
}

impl AnalysisOutcome {
    pub fn base_column_names(&self) -> Vec<&'static str> {
        self.working
            .base_columns()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }
}

/// Runs the core on an already cleaned working set: correlation,
/// standardisation, model-order selection, assignment, naming, profiling.
/// Produces no files.
///
/// Arguments:
/// * `working` - Cleaned input table.
/// * `config` - Run settings (candidate range, seed, naming units).
/// * `multi_progress` - Optional `MultiProgress` for the selector's bar.
///
/// Returns:
/// The `AnalysisOutcome`, or the first `PipelineError` raised by a component.
pub fn run_core(
    working: WorkingSet,
    config: &AnalysisConfig,
    multi_progress: Option<MultiProgress>,
) -> Result<AnalysisOutcome, PipelineError> {
    let start = Instant::now();

    let correlations = pearson_matrix(working.raw.view(), &working.features);

    let (scaler, scaled) = standardize(working.raw.view())?;
    info!(
        "Standardised {} records over {} features (means {:.3}, scales {:.3})",
        scaled.nrows(),
        scaled.ncols(),
        scaler.mean(),
        scaler.scale()
    );

    let model_order = config.model_order_config();
    let selection = select_model_order(scaled.view(), &model_order, multi_progress)?;
    info!(
        "👉 Selected k = {} (silhouette={:.3})",
        selection.k, selection.score
    );

    let assignment = assign_clusters(scaled.view(), selection.k, &model_order)?;

    let centroids = match config.naming_units {
        NamingUnits::Original => group_means(working.raw.view(), &assignment.labels, assignment.k),
        NamingUnits::Scaled => assignment.centroids_scaled.clone(),
    };
    info!("Naming {} clusters from {} centroids", assignment.k, config.naming_units);
    let names = name_clusters(&centroids, &working.features);

    let profiles = build_profiles(working.raw.view(), &working.features, &assignment, &names)?;
    let detail_rows = build_detail_rows(&working, &assignment, &names);

    info!(
        "Core analysis finished in {:.2?}: {} records in {} groups",
        start.elapsed(),
        working.len(),
        assignment.k
    );

    Ok(AnalysisOutcome {
        working,
        correlations,
        selection,
        assignment,
        names,
        profiles,
        detail_rows,
    })
}

/// Writes charts and tables into `output_dir`, creating it if needed.
/// Returns the produced paths in write order. When any write fails, the
/// files already written by this call are removed before the error returns.
pub fn export_artifacts(outcome: &AnalysisOutcome, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let mut produced = Vec::new();
    match write_artifacts(outcome, output_dir, &mut produced) {
        Ok(()) => Ok(produced),
        Err(e) => {
            remove_artifacts(&produced);
            Err(e)
        }
    }
}

fn write_artifacts(
    outcome: &AnalysisOutcome,
    output_dir: &Path,
    produced: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = output_dir.join(CORRELATIONS_FILE);
    charts::write_chart(&path, &charts::correlation_heatmap(&outcome.correlations))?;
    produced.push(path);

    if let Some(chart) = charts::danceability_popularity_scatter(&outcome.working) {
        let path = output_dir.join(DANCE_VS_POP_FILE);
        charts::write_chart(&path, &chart)?;
        produced.push(path);
    } else {
        info!("Skipping danceability/popularity chart: column not available");
    }

    let path = output_dir.join(CLUSTERS_PCA_FILE);
    charts::write_chart(&path, &charts::projection_scatter(&outcome.detail_rows))?;
    produced.push(path);

    let path = output_dir.join(PROFILE_FILE);
    tables::save_profile_csv(&path, &outcome.working.features, &outcome.profiles)?;
    produced.push(path);

    let path = output_dir.join(DETAIL_FILE);
    tables::save_detail_csv(
        &path,
        &outcome.base_column_names(),
        &outcome.working.features,
        &outcome.detail_rows,
    )?;
    produced.push(path);

    Ok(())
}

/// Best-effort removal of files written by a run that did not complete.
pub fn remove_artifacts(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => warn!("Removed partial artifact {}", path.display()),
            Err(e) => warn!("Could not remove partial artifact {}: {}", path.display(), e),
        }
    }
}
