pub mod cluster;
pub mod stats_models;
pub mod track;

pub use cluster::{ClusterName, ClusterProfile, DetailRow};
pub use track::{FeatureKind, FeatureSet, TrackRecord, WorkingSet, BASE_COLUMNS};
