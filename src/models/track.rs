// src/models/track.rs

use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;
use std::fmt;

/// Optional identifying columns carried through to the detail export when present.
pub const BASE_COLUMNS: [&str; 4] = ["track_name", "artist", "year", "popularity"];

/// The four numeric attributes the clustering works on, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Danceability,
    Energy,
    Valence,
    Tempo,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::Danceability,
        FeatureKind::Energy,
        FeatureKind::Valence,
        FeatureKind::Tempo,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            FeatureKind::Danceability => "danceability",
            FeatureKind::Energy => "energy",
            FeatureKind::Valence => "valence",
            FeatureKind::Tempo => "tempo",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.column_name() == name)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Features found in an input header. Always canonical order, never fewer than two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    kinds: Vec<FeatureKind>,
}

impl FeatureSet {
    pub const MIN_FEATURES: usize = 2;

    /// Selects every known feature column present in `header`.
    /// Returns `None` when fewer than two qualify.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Option<Self> {
        let kinds: Vec<FeatureKind> = FeatureKind::ALL
            .into_iter()
            .filter(|kind| header.iter().any(|h| h.as_ref() == kind.column_name()))
            .collect();
        Self::new(kinds)
    }

    /// Builds a set from explicit kinds; duplicates are dropped and order normalised.
    pub fn new(mut kinds: Vec<FeatureKind>) -> Option<Self> {
        kinds.sort();
        kinds.dedup();
        if kinds.len() < Self::MIN_FEATURES {
            return None;
        }
        Some(Self { kinds })
    }

    pub fn kinds(&self) -> &[FeatureKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn contains(&self, kind: FeatureKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn position(&self, kind: FeatureKind) -> Option<usize> {
        self.kinds.iter().position(|k| *k == kind)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.column_name()).collect()
    }
}

/// One input row, cells aligned with the table header. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub fields: Vec<Option<String>>,
}

impl TrackRecord {
    pub fn get(&self, column: usize) -> Option<&str> {
        self.fields.get(column).and_then(|f| f.as_deref())
    }
}

/// The de-duplicated, complete-feature subset of the loaded table.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    pub header: Vec<String>,
    pub features: FeatureSet,
    pub records: Vec<TrackRecord>,
    /// `n × d` raw feature values, row `i` belongs to `records[i]`.
    pub raw: Array2<f64>,
    pub loaded_rows: usize,
    pub duplicate_rows: usize,
    pub incomplete_rows: usize,
}

impl WorkingSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Identifying columns present in this table, in export order.
    pub fn base_columns(&self) -> Vec<(&'static str, usize)> {
        BASE_COLUMNS
            .iter()
            .filter_map(|name| self.column_index(name).map(|idx| (*name, idx)))
            .collect()
    }

    pub fn feature_column(&self, kind: FeatureKind) -> Option<ArrayView1<'_, f64>> {
        self.features
            .position(kind)
            .map(|pos| self.raw.index_axis(Axis(1), pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_keeps_canonical_order() {
        let header = vec!["tempo", "artist", "energy", "danceability"];
        let set = FeatureSet::from_header(&header).unwrap();
        assert_eq!(
            set.kinds(),
            &[FeatureKind::Danceability, FeatureKind::Energy, FeatureKind::Tempo]
        );
        assert_eq!(set.position(FeatureKind::Tempo), Some(2));
        assert!(!set.contains(FeatureKind::Valence));
    }

    #[test]
    fn test_feature_set_requires_two_columns() {
        assert!(FeatureSet::from_header(&["energy", "track_name"]).is_none());
        assert!(FeatureSet::new(vec![FeatureKind::Energy, FeatureKind::Energy]).is_none());
    }

    #[test]
    fn test_column_names_are_exact() {
        assert_eq!(FeatureKind::from_column("valence"), Some(FeatureKind::Valence));
        assert_eq!(FeatureKind::from_column("Valence"), None);
    }
}
