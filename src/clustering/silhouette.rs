// src/clustering/silhouette.rs

use ndarray::{ArrayView2, Axis};

use crate::errors::PipelineError;

/// Mean silhouette coefficient of a partition, using Euclidean distance.
///
/// For each point, `a` is its mean distance to the rest of its own group and
/// `b` the smallest mean distance to another group; its coefficient is
/// `(b - a) / max(a, b)`. Members of single-point groups score 0.
///
/// Returns a `Computation` error when the score is undefined: fewer than two
/// groups, or every point in its own group.
pub fn silhouette_score(data: ArrayView2<'_, f64>, labels: &[usize]) -> Result<f64, PipelineError> {
    let n = data.nrows();
    if labels.len() != n {
        return Err(PipelineError::computation(format!(
            "{} labels for {} samples",
            labels.len(),
            n
        )));
    }

    let n_groups = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; n_groups];
    for &label in labels {
        sizes[label] += 1;
    }
    let distinct = sizes.iter().filter(|&&s| s > 0).count();
    if distinct < 2 || distinct >= n {
        return Err(PipelineError::computation(format!(
            "silhouette needs 2 <= groups <= n_samples - 1, got {} groups for {} samples",
            distinct, n
        )));
    }

    let rows: Vec<_> = data.axis_iter(Axis(0)).collect();
    let mut total = 0.0;
    let mut sums = vec![0.0f64; n_groups];

    for i in 0..n {
        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }

        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i == j {
                continue;
            }
            let dist = rows[i]
                .iter()
                .zip(rows[j].iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt();
            sums[labels[j]] += dist;
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_groups)
            .filter(|&g| g != own && sizes[g] > 0)
            .map(|g| sums[g] / sizes[g] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Ok(total / n as f64)
}
