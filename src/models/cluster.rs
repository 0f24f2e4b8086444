// src/models/cluster.rs

use serde::{Serialize, Serializer};
use std::fmt;

use super::track::FeatureKind;

/// Closed set of labels a cluster can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterName {
    HighEnergyDance,
    UpbeatPop,
    MoodyLowEnergy,
    ChillMellow,
    FastEnergetic,
    Groovy,
    BrightAcoustic,
    MixedBalanced,
}

impl ClusterName {
    pub fn label(self) -> &'static str {
        match self {
            ClusterName::HighEnergyDance => "High-Energy Dance",
            ClusterName::UpbeatPop => "Upbeat Pop",
            ClusterName::MoodyLowEnergy => "Moody / Low Energy",
            ClusterName::ChillMellow => "Chill Mellow",
            ClusterName::FastEnergetic => "Fast & Energetic",
            ClusterName::Groovy => "Groovy",
            ClusterName::BrightAcoustic => "Bright Acoustic",
            ClusterName::MixedBalanced => "Mixed / Balanced",
        }
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ClusterName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Aggregate view of one group, computed over its member records in raw units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    /// Unrounded per-feature means; use `rounded_means` for reporting.
    pub means: Vec<(FeatureKind, f64)>,
    pub count: usize,
    pub name: ClusterName,
}

impl ClusterProfile {
    pub fn rounded_means(&self) -> Vec<(FeatureKind, f64)> {
        self.means
            .iter()
            .map(|(kind, mean)| (*kind, round_to(*mean, 3)))
            .collect()
    }

    pub fn mean_of(&self, kind: FeatureKind) -> Option<f64> {
        self.means.iter().find(|(k, _)| *k == kind).map(|(_, m)| *m)
    }
}

/// One exported record: identifying cells, raw features, group and label.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    /// Cells of the present base columns, same order as `WorkingSet::base_columns`.
    pub base: Vec<Option<String>>,
    pub features: Vec<f64>,
    pub cluster: usize,
    pub name: ClusterName,
    pub pc1: f64,
    pub pc2: f64,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
