pub mod assigner;
pub mod kmeans;
pub mod model_order;
pub mod naming;
pub mod normalizer;
pub mod profile;
pub mod projection;
pub mod silhouette;

#[cfg(test)]
pub(crate) mod test_support;

pub use assigner::{assign_clusters, ClusterAssignment};
pub use kmeans::{KMeansFit, KMeansParams};
pub use model_order::{
    select_model_order, CandidateEvaluation, CandidateOutcome, ModelOrderConfig,
    ModelOrderSelection,
};
pub use naming::{name_centroid, name_clusters, CentroidView, NamingUnits};
pub use normalizer::FeatureScaler;
pub use profile::{build_detail_rows, build_profiles};
pub use projection::Projection;
pub use silhouette::silhouette_score;
