// src/clustering/model_order.rs

use indicatif::{MultiProgress, ProgressBar};
use log::{info, warn};
use ndarray::{ArrayView2, Axis};
use std::collections::HashSet;
use std::fmt;

use crate::clustering::kmeans::{self, KMeansFit, KMeansParams};
use crate::clustering::silhouette::silhouette_score;
use crate::errors::PipelineError;
use crate::utils::progress_config::styled_bar;

/// Candidate range, k-means settings and validity rules shared by the
/// selector and the final assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOrderConfig {
    pub k_min: usize,
    pub k_max: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
    /// Candidates with any group smaller than this are rejected.
    pub min_cluster_size: usize,
}

impl Default for ModelOrderConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 6,
            n_init: kmeans::DEFAULT_N_INIT,
            max_iter: kmeans::DEFAULT_MAX_ITER,
            tolerance: kmeans::DEFAULT_TOLERANCE,
            seed: 42,
            min_cluster_size: 1,
        }
    }
}

impl ModelOrderConfig {
    pub fn kmeans_params(&self, k: usize) -> KMeansParams {
        KMeansParams::new(k, self.seed)
            .n_init(self.n_init)
            .max_iter(self.max_iter)
            .tolerance(self.tolerance)
    }

    pub fn candidates(&self) -> impl Iterator<Item = usize> {
        self.k_min..=self.k_max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Scored { score: f64, inertia: f64 },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvaluation {
    pub k: usize,
    pub outcome: CandidateOutcome,
}

impl CandidateEvaluation {
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            CandidateOutcome::Scored { score, .. } => Some(score),
            CandidateOutcome::Rejected { .. } => None,
        }
    }

    fn rejected(k: usize, reason: impl Into<String>) -> Self {
        Self {
            k,
            outcome: CandidateOutcome::Rejected {
                reason: reason.into(),
            },
        }
    }
}

impl fmt::Display for CandidateEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CandidateOutcome::Scored { score, inertia } => {
                write!(f, "k={}: silhouette={:.3} (inertia={:.3})", self.k, score, inertia)
            }
            CandidateOutcome::Rejected { reason } => write!(f, "k={}: rejected ({})", self.k, reason),
        }
    }
}

/// Chosen group count plus the full evaluation table, in scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOrderSelection {
    pub k: usize,
    pub score: f64,
    pub evaluations: Vec<CandidateEvaluation>,
}

/// Fits every candidate k in ascending order, scores each partition and
/// keeps the best.
///
/// Arguments:
/// * `scaled` - Standardised feature matrix, one row per working-set record.
/// * `config` - Candidate range, seeding and validity rules.
/// * `multi_progress` - Optional `MultiProgress` for a per-candidate bar.
///
/// Returns:
/// The winning k and its score, or a `Computation` error when no candidate
/// produced a valid score.
pub fn select_model_order(
    scaled: ArrayView2<'_, f64>,
    config: &ModelOrderConfig,
    multi_progress: Option<MultiProgress>,
) -> Result<ModelOrderSelection, PipelineError> {
    let candidate_count = config.candidates().count() as u64;
    let scan_pb: Option<ProgressBar> = multi_progress
        .as_ref()
        .map(|mp| mp.add(styled_bar(candidate_count, "    ", "Scanning group counts...")));

    let distinct = distinct_rows(scaled);
    let mut evaluations = Vec::with_capacity(candidate_count as usize);
    for k in config.candidates() {
        if let Some(pb) = &scan_pb {
            pb.set_message(format!("Evaluating k={}", k));
        }
        let evaluation = evaluate_candidate(scaled, distinct, k, config);
        match &evaluation.outcome {
            CandidateOutcome::Scored { .. } => info!("  {}", evaluation),
            CandidateOutcome::Rejected { .. } => warn!("  {}", evaluation),
        }
        evaluations.push(evaluation);
        if let Some(pb) = &scan_pb {
            pb.inc(1);
        }
    }

    let best = pick_best(&evaluations);
    if let Some(pb) = &scan_pb {
        pb.finish_with_message(match best {
            Some((k, score)) => format!("Selected k={} (silhouette={:.3})", k, score),
            None => "No valid group count".to_string(),
        });
    }

    let (k, score) = best.ok_or_else(|| {
        PipelineError::computation(format!(
            "no candidate group count in [{}, {}] produced a valid silhouette score for {} records",
            config.k_min,
            config.k_max,
            scaled.nrows()
        ))
    })?;

    Ok(ModelOrderSelection {
        k,
        score,
        evaluations,
    })
}

/// Fold over evaluations in scan order. A later candidate replaces the
/// running best only with a strictly higher score, so the lowest k wins ties.
pub fn pick_best(evaluations: &[CandidateEvaluation]) -> Option<(usize, f64)> {
    evaluations
        .iter()
        .filter_map(|e| e.score().map(|s| (e.k, s)))
        .fold(None, |best, (k, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((k, score)),
        })
}

/// Fits one candidate and scores it, or explains why it cannot be used.
/// `distinct` is the number of distinct rows in `scaled`.
pub fn evaluate_candidate(
    scaled: ArrayView2<'_, f64>,
    distinct: usize,
    k: usize,
    config: &ModelOrderConfig,
) -> CandidateEvaluation {
    let n = scaled.nrows();
    if n < k {
        return CandidateEvaluation::rejected(k, format!("only {} records", n));
    }
    if distinct < k {
        return CandidateEvaluation::rejected(k, format!("only {} distinct records", distinct));
    }

    let fit = match kmeans::fit(scaled, &config.kmeans_params(k)) {
        Ok(fit) => fit,
        Err(e) => return CandidateEvaluation::rejected(k, e.to_string()),
    };
    if let Some(reason) = partition_defect(&fit, config.min_cluster_size) {
        return CandidateEvaluation::rejected(k, reason);
    }

    match silhouette_score(scaled, &fit.labels) {
        Ok(score) if score.is_finite() => CandidateEvaluation {
            k,
            outcome: CandidateOutcome::Scored {
                score,
                inertia: fit.inertia,
            },
        },
        Ok(score) => CandidateEvaluation::rejected(k, format!("non-finite score {}", score)),
        Err(e) => CandidateEvaluation::rejected(k, e.to_string()),
    }
}

/// Empty or undersized groups make a partition unusable for selection.
pub fn partition_defect(fit: &KMeansFit, min_cluster_size: usize) -> Option<String> {
    let sizes = fit.cluster_sizes();
    if let Some(empty) = sizes.iter().position(|&s| s == 0) {
        return Some(format!("group {} is empty", empty));
    }
    sizes
        .iter()
        .enumerate()
        .find(|(_, s)| **s < min_cluster_size)
        .map(|(g, s)| {
            format!(
                "group {} has {} records, minimum is {}",
                g, s, min_cluster_size
            )
        })
}

pub fn distinct_rows(data: ArrayView2<'_, f64>) -> usize {
    data.axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
                .collect::<Vec<u64>>()
        })
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::normalizer::standardize;
    use crate::clustering::test_support::three_blobs;

    fn scored(k: usize, score: f64) -> CandidateEvaluation {
        CandidateEvaluation {
            k,
            outcome: CandidateOutcome::Scored {
                score,
                inertia: 1.0,
            },
        }
    }

    #[test]
    fn test_three_blobs_select_three_groups() {
        let raw = three_blobs(20, 3);
        let (_, scaled) = standardize(raw.view()).unwrap();
        let selection =
            select_model_order(scaled.view(), &ModelOrderConfig::default(), None).unwrap();

        assert_eq!(selection.k, 3);
        assert!(selection.score > 0.5, "score {}", selection.score);
        let ks: Vec<usize> = selection.evaluations.iter().map(|e| e.k).collect();
        assert_eq!(ks, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_ties_keep_the_lower_k() {
        let evaluations = vec![scored(2, 0.4), scored(3, 0.7), scored(4, 0.7), scored(5, 0.1)];
        assert_eq!(pick_best(&evaluations), Some((3, 0.7)));
    }

    #[test]
    fn test_rejected_candidates_never_win() {
        let evaluations = vec![
            CandidateEvaluation::rejected(2, "group 1 is empty"),
            scored(3, -0.2),
            CandidateEvaluation::rejected(4, "only 3 records"),
        ];
        assert_eq!(pick_best(&evaluations), Some((3, -0.2)));
        assert_eq!(pick_best(&evaluations[..1]), None);
    }

    #[test]
    fn test_too_few_records_is_a_computation_error() {
        let raw = ndarray::array![[0.1, 0.2], [0.9, 0.8]];
        let (_, scaled) = standardize(raw.view()).unwrap();
        let err = select_model_order(scaled.view(), &ModelOrderConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Computation(_)));
    }

    #[test]
    fn test_duplicate_points_reject_large_k() {
        let raw = ndarray::array![
            [0.1, 0.2],
            [0.1, 0.2],
            [0.1, 0.2],
            [0.9, 0.8],
            [0.9, 0.8],
            [0.9, 0.8]
        ];
        let (_, scaled) = standardize(raw.view()).unwrap();
        let selection =
            select_model_order(scaled.view(), &ModelOrderConfig::default(), None).unwrap();
        assert_eq!(selection.k, 2);
        assert!(selection.evaluations[1..].iter().all(|e| e.score().is_none()));
    }

    #[test]
    fn test_min_cluster_size_rejects_small_groups() {
        let raw = three_blobs(5, 9);
        let (_, scaled) = standardize(raw.view()).unwrap();
        let config = ModelOrderConfig {
            min_cluster_size: 6,
            ..ModelOrderConfig::default()
        };
        let distinct = distinct_rows(scaled.view());
        let evaluation = evaluate_candidate(scaled.view(), distinct, 3, &config);
        assert!(matches!(evaluation.outcome, CandidateOutcome::Rejected { .. }));
    }

    #[test]
    fn test_distinct_rows_counts_signed_zero_once() {
        let data = ndarray::array![[0.0, 1.0], [-0.0, 1.0], [0.5, 1.0]];
        assert_eq!(distinct_rows(data.view()), 2);
    }

    #[test]
    fn test_candidate_above_distinct_count_is_rejected() {
        let raw = three_blobs(5, 2);
        let (_, scaled) = standardize(raw.view()).unwrap();
        let evaluation = evaluate_candidate(scaled.view(), 2, 3, &ModelOrderConfig::default());
        assert_eq!(
            evaluation.outcome,
            CandidateOutcome::Rejected {
                reason: "only 2 distinct records".to_string()
            }
        );
    }
}
