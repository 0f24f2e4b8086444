// src/utils/store_config.rs

use log::{debug, info};
use std::env;

pub const DEFAULT_TABLE: &str = "track_clusters";
pub const DEFAULT_TOP_ARTISTS: i64 = 5;

/// Relational store settings. The store is part of every run unless
/// `STORE_ENABLED=false` or `--no-store` turns it off. Connection parameters
/// are read separately by `export::store::build_pg_config`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub enabled: bool,
    pub table: String,
    pub top_artists: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table: DEFAULT_TABLE.to_string(),
            top_artists: DEFAULT_TOP_ARTISTS,
        }
    }
}

impl StoreConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("STORE_ENABLED")
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(true);
        let table = lookup("STORE_TABLE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let top_artists = lookup("STORE_TOP_ARTISTS")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_TOP_ARTISTS);

        debug!(
            "Store config: enabled={}, table={}, top_artists={}",
            enabled, table, top_artists
        );
        Self {
            enabled,
            table,
            top_artists,
        }
    }

    pub fn log_config(&self) {
        if self.enabled {
            info!("🗄️  Relational store ENABLED");
            info!("   Table: {} (replaced on every run)", self.table);
            info!("   Top artists reported: {}", self.top_artists);
        } else {
            info!("🗄️  Relational store DISABLED - flat files only");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_by_default() {
        let config = StoreConfig::from_lookup(|_| None);
        assert_eq!(config, StoreConfig::default());
        assert!(config.enabled);
    }

    #[test]
    fn test_store_can_be_turned_off() {
        let config = StoreConfig::from_lookup(|key| match key {
            "STORE_ENABLED" => Some("false".to_string()),
            _ => None,
        });
        assert!(!config.enabled);

        // unparseable values keep the store on
        let config = StoreConfig::from_lookup(|key| match key {
            "STORE_ENABLED" => Some("maybe".to_string()),
            _ => None,
        });
        assert!(config.enabled);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = StoreConfig::from_lookup(|key| match key {
            "STORE_ENABLED" => Some("true".to_string()),
            "STORE_TABLE" => Some("tracks_2024".to_string()),
            "STORE_TOP_ARTISTS" => Some("0".to_string()),
            _ => None,
        });
        assert!(config.enabled);
        assert_eq!(config.table, "tracks_2024");
        // non-positive counts keep the default
        assert_eq!(config.top_artists, DEFAULT_TOP_ARTISTS);
    }
}
