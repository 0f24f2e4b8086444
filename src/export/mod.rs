pub mod charts;
pub mod store;
pub mod tables;

pub const CORRELATIONS_FILE: &str = "correlations.json";
pub const DANCE_VS_POP_FILE: &str = "dance_vs_pop.json";
pub const CLUSTERS_PCA_FILE: &str = "clusters_pca.json";
pub const PROFILE_FILE: &str = "cluster_profile.csv";
pub const DETAIL_FILE: &str = "spotify_with_clusters.csv";
