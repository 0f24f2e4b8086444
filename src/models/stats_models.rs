// src/models/stats_models.rs

use chrono::NaiveDateTime;
use serde::Serialize;

/// Run-level bookkeeping: counts, chosen model order and phase timings (seconds).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub description: Option<String>,
    pub input_path: String,

    pub loaded_rows: usize,
    pub duplicate_rows: usize,
    pub incomplete_rows: usize,
    pub working_rows: usize,

    pub selected_k: usize,
    pub silhouette: f64,
    pub cluster_counts: Vec<usize>,

    pub load_time: f64,
    pub clustering_time: f64,
    pub export_time: f64,
    pub store_time: f64,
    pub total_processing_time: f64,
}

impl PipelineStats {
    pub fn new(
        run_id: String,
        run_timestamp: NaiveDateTime,
        description: Option<String>,
        input_path: String,
    ) -> Self {
        Self {
            run_id,
            run_timestamp,
            description,
            input_path,
            loaded_rows: 0,
            duplicate_rows: 0,
            incomplete_rows: 0,
            working_rows: 0,
            selected_k: 0,
            silhouette: 0.0,
            cluster_counts: Vec::new(),
            load_time: 0.0,
            clustering_time: 0.0,
            export_time: 0.0,
            store_time: 0.0,
            total_processing_time: 0.0,
        }
    }
}
