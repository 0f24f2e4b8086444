// src/utils/analysis_config.rs

use anyhow::{bail, Result};
use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::clustering::kmeans::{DEFAULT_MAX_ITER, DEFAULT_N_INIT, DEFAULT_TOLERANCE};
use crate::clustering::model_order::ModelOrderConfig;
use crate::clustering::naming::NamingUnits;

/// Run-level settings for the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub k_min: usize,
    pub k_max: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub min_cluster_size: usize,
    pub naming_units: NamingUnits,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("spotify.csv"),
            output_dir: PathBuf::from("."),
            seed: 42,
            k_min: 2,
            k_max: 6,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            min_cluster_size: 1,
            naming_units: NamingUnits::Original,
        }
    }
}

impl AnalysisConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset keys keep their
    /// defaults; unparseable values keep their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            input_path: lookup("INPUT_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_path),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            seed: parse_or(&lookup, "CLUSTER_SEED", defaults.seed),
            k_min: parse_or(&lookup, "CLUSTER_K_MIN", defaults.k_min),
            k_max: parse_or(&lookup, "CLUSTER_K_MAX", defaults.k_max),
            n_init: parse_or(&lookup, "KMEANS_N_INIT", defaults.n_init),
            max_iter: parse_or(&lookup, "KMEANS_MAX_ITER", defaults.max_iter),
            tolerance: parse_or(&lookup, "KMEANS_TOLERANCE", defaults.tolerance),
            min_cluster_size: parse_or(&lookup, "MIN_CLUSTER_SIZE", defaults.min_cluster_size),
            naming_units: parse_or(&lookup, "NAMING_UNITS", defaults.naming_units),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_min < 2 {
            bail!("CLUSTER_K_MIN must be at least 2, got {}", self.k_min);
        }
        if self.k_min > self.k_max {
            bail!(
                "CLUSTER_K_MIN ({}) must not exceed CLUSTER_K_MAX ({})",
                self.k_min,
                self.k_max
            );
        }
        if self.n_init == 0 {
            bail!("KMEANS_N_INIT must be positive");
        }
        if self.max_iter == 0 {
            bail!("KMEANS_MAX_ITER must be positive");
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            bail!("KMEANS_TOLERANCE must be a positive number, got {}", self.tolerance);
        }
        Ok(())
    }

    pub fn model_order_config(&self) -> ModelOrderConfig {
        ModelOrderConfig {
            k_min: self.k_min,
            k_max: self.k_max,
            n_init: self.n_init,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
            seed: self.seed,
            min_cluster_size: self.min_cluster_size,
        }
    }

    pub fn log_config(&self) {
        info!("📁 Input: {}", self.input_path.display());
        info!("📂 Output directory: {}", self.output_dir.display());
        info!(
            "🔢 Candidate group counts: {}..={} (seed {})",
            self.k_min, self.k_max, self.seed
        );
        info!(
            "   k-means: n_init={}, max_iter={}, tolerance={:e}, min_cluster_size={}",
            self.n_init, self.max_iter, self.tolerance, self.min_cluster_size
        );
        info!("🏷️  Naming units: {:?}", self.naming_units);
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Ignoring {}='{}' ({}); using default {}",
                    key, raw, e, default
                );
                default
            }
        },
    }
}
