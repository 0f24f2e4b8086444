// src/clustering/assigner.rs

use log::info;
use ndarray::{Array2, ArrayView2};

use crate::clustering::kmeans;
use crate::clustering::model_order::{partition_defect, ModelOrderConfig};
use crate::clustering::projection::Projection;
use crate::errors::PipelineError;

const PROJECTION_COMPONENTS: usize = 2;

/// Final partition of the working set at the selected k, plus 2-D coordinates
/// for plotting. Group ids are dense `0..k`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub k: usize,
    pub labels: Vec<usize>,
    /// `k × d` centroids in scaled units.
    pub centroids_scaled: Array2<f64>,
    pub inertia: f64,
    /// `n × 2` principal-component coordinates, row `i` belongs to record `i`.
    pub projection: Array2<f64>,
    pub explained_variance_ratio: Vec<f64>,
}

impl ClusterAssignment {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.k];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Record indices assigned to `cluster`, in working-set order.
    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, label)| **label == cluster)
            .map(|(i, _)| i)
    }

    pub fn coordinates(&self, record: usize) -> (f64, f64) {
        (self.projection[[record, 0]], self.projection[[record, 1]])
    }
}

/// Refits k-means at the selected `k` with the selector's seeding policy and
/// projects the scaled data onto its first two principal components.
///
/// Arguments:
/// * `scaled` - Standardised feature matrix.
/// * `k` - Group count chosen by the model-order selector.
/// * `config` - The same configuration the selector ran with.
///
/// Returns:
/// A `ClusterAssignment` covering every row, or a `Computation` error if the
/// refit leaves a group empty.
pub fn assign_clusters(
    scaled: ArrayView2<'_, f64>,
    k: usize,
    config: &ModelOrderConfig,
) -> Result<ClusterAssignment, PipelineError> {
    let fit = kmeans::fit(scaled, &config.kmeans_params(k))?;
    if let Some(reason) = partition_defect(&fit, 1) {
        return Err(PipelineError::computation(format!(
            "final fit at k={} is degenerate: {}",
            k, reason
        )));
    }

    let projection = Projection::fit(scaled, PROJECTION_COMPONENTS)?;
    let coordinates = projection.transform(scaled);

    let assignment = ClusterAssignment {
        k,
        labels: fit.labels,
        centroids_scaled: fit.centroids,
        inertia: fit.inertia,
        projection: coordinates,
        explained_variance_ratio: projection.explained_variance_ratio.clone(),
    };
    info!(
        "Assigned {} records to {} groups (sizes {:?}, inertia {:.3}, projection keeps {:.1}% of variance)",
        assignment.len(),
        k,
        assignment.counts(),
        assignment.inertia,
        assignment.explained_variance_ratio.iter().sum::<f64>() * 100.0
    );
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::normalizer::standardize;
    use crate::clustering::test_support::three_blobs;
    use std::collections::HashSet;

    #[test]
    fn test_every_record_gets_one_dense_group() {
        let raw = three_blobs(15, 21);
        let (_, scaled) = standardize(raw.view()).unwrap();
        let assignment = assign_clusters(scaled.view(), 3, &ModelOrderConfig::default()).unwrap();

        assert_eq!(assignment.len(), 45);
        let used: HashSet<usize> = assignment.labels.iter().copied().collect();
        assert_eq!(used, (0..3).collect::<HashSet<_>>());
        assert_eq!(assignment.counts(), vec![15, 15, 15]);
        assert_eq!(assignment.counts().iter().sum::<usize>(), 45);
        assert_eq!(assignment.projection.shape(), &[45, 2]);
    }

    #[test]
    fn test_blob_members_share_a_group() {
        let raw = three_blobs(10, 5);
        let (_, scaled) = standardize(raw.view()).unwrap();
        let assignment = assign_clusters(scaled.view(), 3, &ModelOrderConfig::default()).unwrap();

        for blob in 0..3 {
            let first = assignment.labels[blob * 10];
            assert!(assignment.labels[blob * 10..(blob + 1) * 10]
                .iter()
                .all(|&l| l == first));
            assert_eq!(assignment.members(first).count(), 10);
        }
    }

    #[test]
    fn test_assignment_matches_selector_fit() {
        let raw = three_blobs(8, 13);
        let (_, scaled) = standardize(raw.view()).unwrap();
        let config = ModelOrderConfig::default();
        let a = assign_clusters(scaled.view(), 4, &config).unwrap();
        let fit = kmeans::fit(scaled.view(), &config.kmeans_params(4)).unwrap();
        assert_eq!(a.labels, fit.labels);
    }
}
