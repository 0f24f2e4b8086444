// src/clustering/profile.rs

use log::debug;
use ndarray::ArrayView2;

use crate::clustering::assigner::ClusterAssignment;
use crate::clustering::naming::group_means;
use crate::errors::PipelineError;
use crate::models::{ClusterName, ClusterProfile, DetailRow, FeatureSet, WorkingSet};

/// Builds one profile per group from the raw (unscaled) features.
///
/// Arguments:
/// * `raw` - Raw feature matrix of the working set.
/// * `features` - Column layout of `raw`.
/// * `assignment` - Final partition.
/// * `names` - One label per group, indexed by group id.
///
/// Returns:
/// Profiles ordered by group id.
pub fn build_profiles(
    raw: ArrayView2<'_, f64>,
    features: &FeatureSet,
    assignment: &ClusterAssignment,
    names: &[ClusterName],
) -> Result<Vec<ClusterProfile>, PipelineError> {
    if raw.nrows() != assignment.len() {
        return Err(PipelineError::computation(format!(
            "assignment covers {} records but the feature matrix has {}",
            assignment.len(),
            raw.nrows()
        )));
    }
    if names.len() != assignment.k {
        return Err(PipelineError::computation(format!(
            "{} names for {} groups",
            names.len(),
            assignment.k
        )));
    }

    let means = group_means(raw, &assignment.labels, assignment.k);
    let counts = assignment.counts();
    let profiles: Vec<ClusterProfile> = (0..assignment.k)
        .map(|cluster| ClusterProfile {
            cluster,
            means: features
                .kinds()
                .iter()
                .zip(means.row(cluster).iter())
                .map(|(kind, mean)| (*kind, *mean))
                .collect(),
            count: counts[cluster],
            name: names[cluster],
        })
        .collect();

    for profile in &profiles {
        debug!(
            "Profile {} ({}): {} records, means {:?}",
            profile.cluster,
            profile.name,
            profile.count,
            profile.rounded_means()
        );
    }
    Ok(profiles)
}

/// Expands the assignment into one detail row per working-set record.
pub fn build_detail_rows(
    working: &WorkingSet,
    assignment: &ClusterAssignment,
    names: &[ClusterName],
) -> Vec<DetailRow> {
    let base_columns = working.base_columns();
    working
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let cluster = assignment.labels[i];
            let (pc1, pc2) = assignment.coordinates(i);
            DetailRow {
                base: base_columns
                    .iter()
                    .map(|(_, idx)| record.get(*idx).map(str::to_string))
                    .collect(),
                features: working.raw.row(i).to_vec(),
                cluster,
                name: names[cluster],
                pc1,
                pc2,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::model_order::ModelOrderConfig;
    use crate::clustering::naming::name_clusters;
    use crate::clustering::normalizer::standardize;
    use crate::clustering::assigner::assign_clusters;
    use crate::clustering::test_support::three_blob_csv;
    use crate::input::loader::read_working_set;
    use ndarray::Axis;

    fn fixture() -> (WorkingSet, ClusterAssignment, Vec<ClusterName>) {
        let csv = three_blob_csv(12, 17);
        let working = read_working_set(csv.as_bytes()).unwrap();
        let (_, scaled) = standardize(working.raw.view()).unwrap();
        let assignment =
            assign_clusters(scaled.view(), 3, &ModelOrderConfig::default()).unwrap();
        let centroids = group_means(working.raw.view(), &assignment.labels, 3);
        let names = name_clusters(&centroids, &working.features);
        (working, assignment, names)
    }

    #[test]
    fn test_counts_sum_to_working_set() {
        let (working, assignment, names) = fixture();
        let profiles =
            build_profiles(working.raw.view(), &working.features, &assignment, &names).unwrap();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles.iter().map(|p| p.count).sum::<usize>(), working.len());
    }

    #[test]
    fn test_means_stay_within_group_range() {
        let (working, assignment, names) = fixture();
        let profiles =
            build_profiles(working.raw.view(), &working.features, &assignment, &names).unwrap();

        for profile in &profiles {
            let members: Vec<usize> = assignment.members(profile.cluster).collect();
            for (col, (_, mean)) in profile.means.iter().enumerate() {
                let values: Vec<f64> = members.iter().map(|&i| working.raw[[i, col]]).collect();
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                assert!(*mean >= min - 1e-12 && *mean <= max + 1e-12);
            }
        }
    }

    #[test]
    fn test_means_are_raw_not_scaled() {
        let (working, assignment, names) = fixture();
        let profiles =
            build_profiles(working.raw.view(), &working.features, &assignment, &names).unwrap();
        let tempo_col = working.raw.index_axis(Axis(1), 3);
        let overall = tempo_col.mean().unwrap();
        // scaled means would be centred around zero
        let avg_of_means: f64 = profiles
            .iter()
            .map(|p| p.means[3].1 * p.count as f64)
            .sum::<f64>()
            / working.len() as f64;
        assert!((avg_of_means - overall).abs() < 1e-9);
        assert!(overall > 50.0);
    }

    #[test]
    fn test_detail_rows_carry_base_columns() {
        let (working, assignment, names) = fixture();
        let rows = build_detail_rows(&working, &assignment, &names);
        assert_eq!(rows.len(), working.len());
        let first = &rows[0];
        assert_eq!(first.base.len(), 4);
        assert_eq!(first.base[0].as_deref(), Some("track 0"));
        assert_eq!(first.name, names[first.cluster]);
        assert_eq!(first.features.len(), 4);
    }

    #[test]
    fn test_name_count_mismatch_is_rejected() {
        let (working, assignment, _) = fixture();
        let err = build_profiles(
            working.raw.view(),
            &working.features,
            &assignment,
            &[ClusterName::Groovy],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Computation(_)));
    }
}
