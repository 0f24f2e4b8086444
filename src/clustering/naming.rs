// src/clustering/naming.rs

use log::{debug, info};
use ndarray::{Array2, ArrayView2, Axis};
use std::fmt;
use std::str::FromStr;

use crate::models::{ClusterName, FeatureKind, FeatureSet};

/// Upper threshold shared by the "high" rules.
pub const HI: f64 = 0.6;
/// Lower threshold shared by the "low" rules.
pub const LO: f64 = -0.4;

/// Which centroid the namer reads: per-group means in raw feature units, or
/// the k-means centroids in standardised units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingUnits {
    #[default]
    Original,
    Scaled,
}

impl FromStr for NamingUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" | "raw" => Ok(NamingUnits::Original),
            "scaled" | "standardized" => Ok(NamingUnits::Scaled),
            other => Err(format!("unknown naming units '{}'", other)),
        }
    }
}

impl fmt::Display for NamingUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingUnits::Original => f.write_str("original"),
            NamingUnits::Scaled => f.write_str("scaled"),
        }
    }
}

/// Centroid as seen by the rules. Features absent from the input read as 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CentroidView {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
}

impl CentroidView {
    /// `values` is aligned with `features.kinds()`.
    pub fn from_features(features: &FeatureSet, values: &[f64]) -> Self {
        let mut view = CentroidView::default();
        for (kind, value) in features.kinds().iter().zip(values.iter()) {
            match kind {
                FeatureKind::Danceability => view.danceability = *value,
                FeatureKind::Energy => view.energy = *value,
                FeatureKind::Valence => view.valence = *value,
                FeatureKind::Tempo => view.tempo = *value,
            }
        }
        view
    }
}

/// One entry of the naming table.
#[derive(Clone, Copy)]
pub struct NamingRule {
    pub name: ClusterName,
    pub matches: fn(&CentroidView) -> bool,
}

fn high_energy_dance(c: &CentroidView) -> bool {
    c.energy > HI && c.danceability > HI
}

fn upbeat_pop(c: &CentroidView) -> bool {
    c.valence > HI && c.danceability > HI
}

fn moody_low_energy(c: &CentroidView) -> bool {
    c.energy < LO && c.valence < LO
}

fn chill_mellow(c: &CentroidView) -> bool {
    c.energy < LO && c.tempo < LO
}

fn fast_energetic(c: &CentroidView) -> bool {
    c.tempo > HI && c.energy > 0.3
}

fn groovy(c: &CentroidView) -> bool {
    c.danceability > HI && c.energy > 0.0
}

fn bright_acoustic(c: &CentroidView) -> bool {
    c.valence > HI && c.energy <= 0.2
}

/// Evaluated top to bottom; the first match names the cluster.
pub const NAMING_RULES: [NamingRule; 7] = [
    NamingRule { name: ClusterName::HighEnergyDance, matches: high_energy_dance },
    NamingRule { name: ClusterName::UpbeatPop, matches: upbeat_pop },
    NamingRule { name: ClusterName::MoodyLowEnergy, matches: moody_low_energy },
    NamingRule { name: ClusterName::ChillMellow, matches: chill_mellow },
    NamingRule { name: ClusterName::FastEnergetic, matches: fast_energetic },
    NamingRule { name: ClusterName::Groovy, matches: groovy },
    NamingRule { name: ClusterName::BrightAcoustic, matches: bright_acoustic },
];

pub fn name_centroid(centroid: &CentroidView) -> ClusterName {
    NAMING_RULES
        .iter()
        .find(|rule| (rule.matches)(centroid))
        .map(|rule| rule.name)
        .unwrap_or(ClusterName::MixedBalanced)
}

/// Names every row of `centroids` (`k × d`, columns aligned with `features`).
pub fn name_clusters(centroids: &Array2<f64>, features: &FeatureSet) -> Vec<ClusterName> {
    let names: Vec<ClusterName> = centroids
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(cluster, row)| {
            let values: Vec<f64> = row.iter().copied().collect();
            let view = CentroidView::from_features(features, &values);
            let name = name_centroid(&view);
            debug!("Cluster {} centroid {:?} -> {}", cluster, view, name);
            name
        })
        .collect();
    for (cluster, name) in names.iter().enumerate() {
        info!("  Cluster {}: {}", cluster, name);
    }
    names
}

/// Per-group means of `raw` over the records labelled with each group.
/// Row `j` of the result is group `j`; an empty group yields a zero row.
pub fn group_means(raw: ArrayView2<'_, f64>, labels: &[usize], k: usize) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, raw.ncols()));
    let mut counts = vec![0usize; k];
    for (row, &label) in raw.axis_iter(Axis(0)).zip(labels.iter()) {
        let mut target = sums.row_mut(label);
        target += &row;
        counts[label] += 1;
    }
    for (j, count) in counts.iter().enumerate() {
        if *count > 0 {
            let mut row = sums.row_mut(j);
            row /= *count as f64;
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroid(danceability: f64, energy: f64, valence: f64, tempo: f64) -> CentroidView {
        CentroidView {
            danceability,
            energy,
            valence,
            tempo,
        }
    }

    #[test]
    fn test_first_rule_wins_over_later_matches() {
        // groovy also matches, but high-energy dance comes first
        let c = centroid(0.9, 0.9, 0.1, 0.1);
        assert!(groovy(&c));
        assert_eq!(name_centroid(&c), ClusterName::HighEnergyDance);
    }

    #[test]
    fn test_no_rule_falls_back_to_mixed() {
        assert_eq!(name_centroid(&centroid(0.1, 0.1, 0.1, 0.1)), ClusterName::MixedBalanced);
    }

    #[test]
    fn test_each_rule_reachable() {
        let cases = [
            (centroid(0.7, 0.7, 0.0, 0.0), ClusterName::HighEnergyDance),
            (centroid(0.7, 0.5, 0.7, 0.0), ClusterName::UpbeatPop),
            (centroid(0.0, -0.5, -0.5, 0.0), ClusterName::MoodyLowEnergy),
            (centroid(0.0, -0.5, 0.0, -0.5), ClusterName::ChillMellow),
            (centroid(0.0, 0.4, 0.0, 0.7), ClusterName::FastEnergetic),
            (centroid(0.7, 0.1, 0.0, 0.0), ClusterName::Groovy),
            (centroid(0.0, 0.2, 0.7, 0.0), ClusterName::BrightAcoustic),
        ];
        for (c, expected) in cases {
            assert_eq!(name_centroid(&c), expected, "centroid {:?}", c);
        }
    }

    #[test]
    fn test_thresholds_are_strict() {
        // exactly at HI does not count as high
        assert_eq!(name_centroid(&centroid(0.6, 0.6, 0.0, 0.0)), ClusterName::MixedBalanced);
        // energy <= 0.2 is inclusive for bright acoustic
        assert_eq!(name_centroid(&centroid(0.0, 0.2, 0.61, 0.0)), ClusterName::BrightAcoustic);
    }

    #[test]
    fn test_missing_features_read_as_zero() {
        let features =
            FeatureSet::new(vec![FeatureKind::Danceability, FeatureKind::Valence]).unwrap();
        let view = CentroidView::from_features(&features, &[0.9, 0.9]);
        assert_eq!(view.energy, 0.0);
        assert_eq!(name_centroid(&view), ClusterName::UpbeatPop);

        let view = CentroidView::from_features(&features, &[0.9, 0.1]);
        // groovy needs energy > 0, which an absent energy column never satisfies
        assert_eq!(name_centroid(&view), ClusterName::MixedBalanced);
    }

    #[test]
    fn test_duplicate_names_are_allowed() {
        let features = FeatureSet::new(FeatureKind::ALL.to_vec()).unwrap();
        let centroids = ndarray::array![[0.1, 0.1, 0.1, 0.1], [0.2, 0.2, 0.2, 0.2]];
        let names = name_clusters(&centroids, &features);
        assert_eq!(names, vec![ClusterName::MixedBalanced, ClusterName::MixedBalanced]);
    }

    #[test]
    fn test_group_means_use_members_only() {
        let raw = ndarray::array![[1.0, 10.0], [3.0, 30.0], [5.0, 50.0]];
        let means = group_means(raw.view(), &[0, 1, 0], 2);
        assert_eq!(means.row(0).to_vec(), vec![3.0, 30.0]);
        assert_eq!(means.row(1).to_vec(), vec![3.0, 30.0]);
    }

    #[test]
    fn test_naming_units_parse() {
        assert_eq!("Scaled".parse::<NamingUnits>(), Ok(NamingUnits::Scaled));
        assert_eq!("original".parse::<NamingUnits>(), Ok(NamingUnits::Original));
        assert!("zscore".parse::<NamingUnits>().is_err());
    }
}
