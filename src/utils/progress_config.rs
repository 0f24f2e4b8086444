// src/utils/progress_config.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::env;

/// Configuration for progress tracking throughout the pipeline
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Whether to show detailed sub-progress bars
    pub detailed: bool,
    /// Whether to show memory usage in progress messages
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            show_memory: true,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<bool>().ok())
                .unwrap_or(true)
        };
        Self {
            enabled: flag("PROGRESS_ENABLED"),
            detailed: flag("PROGRESS_DETAILED"),
            show_memory: flag("PROGRESS_SHOW_MEMORY"),
        }
    }

    /// Create a MultiProgress instance if progress is enabled, None otherwise
    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        if self.enabled {
            Some(MultiProgress::new())
        } else {
            None
        }
    }

    /// Sub-phase bars are handed this instead of the main one.
    pub fn detailed_progress(&self, multi_progress: &Option<MultiProgress>) -> Option<MultiProgress> {
        if self.should_show_detailed() {
            multi_progress.clone()
        } else {
            None
        }
    }

    /// Check if detailed progress should be shown
    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    /// Check if memory usage should be shown
    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

/// Bar style used by every sub-phase bar, indented under the main bar.
pub fn styled_bar(len: u64, indent: &str, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let template = format!(
        "{}{{spinner:.blue}} [{{elapsed_precise}}] {{bar:30.green/blue}} {{pos}}/{{len}} {{msg}}",
        indent
    );
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Style for the top-level pipeline bar.
pub fn main_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_message("Initializing pipeline...");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ProgressConfig::default();
        assert!(config.enabled);
        assert!(config.detailed);
        assert!(config.show_memory);
    }

    #[test]
    fn test_lookup_config() {
        let vars: HashMap<&str, &str> = [
            ("PROGRESS_ENABLED", "false"),
            ("PROGRESS_DETAILED", "false"),
            ("PROGRESS_SHOW_MEMORY", "not-a-bool"),
        ]
        .into_iter()
        .collect();
        let config = ProgressConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert!(!config.enabled);
        assert!(!config.detailed);
        // unparsable values fall back to the default
        assert!(config.show_memory);
    }

    #[test]
    fn test_multi_progress_creation() {
        let mut config = ProgressConfig::default();

        config.enabled = true;
        assert!(config.create_multi_progress().is_some());

        config.enabled = false;
        assert!(config.create_multi_progress().is_none());
    }

    #[test]
    fn test_should_show_methods() {
        let mut config = ProgressConfig::default();
        assert!(config.should_show_detailed());
        assert!(config.should_show_memory());

        config.detailed = false;
        assert!(!config.should_show_detailed());
        assert!(config
            .detailed_progress(&Some(MultiProgress::new()))
            .is_none());

        config.enabled = false;
        config.detailed = true;
        assert!(!config.should_show_detailed());
        assert!(!config.should_show_memory());
    }
}
