// src/clustering/kmeans.rs

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::PipelineError;

pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Hyper-parameters for one best-of-`n_init` k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative tolerance, scaled by the mean per-attribute variance of the data.
    pub tolerance: f64,
    pub seed: u64,
}

impl KMeansParams {
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            seed,
        }
    }

    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Result of the best run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// `k × d` centroids in the units of the fitted data.
    pub centroids: Array2<f64>,
    pub labels: Vec<usize>,
    /// Sum of squared distances of each point to its centroid.
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeansFit {
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_clusters()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Runs k-means++ seeded Lloyd iterations `n_init` times from one seeded
/// generator and keeps the lowest-inertia run. On equal inertia the earlier
/// run is kept, so the result depends only on `data` and `params`.
pub fn fit(data: ArrayView2<'_, f64>, params: &KMeansParams) -> Result<KMeansFit, PipelineError> {
    let n = data.nrows();
    let k = params.n_clusters;
    if k == 0 {
        return Err(PipelineError::computation("n_clusters must be at least 1"));
    }
    if n < k {
        return Err(PipelineError::computation(format!(
            "n_samples={} should be >= n_clusters={}",
            n, k
        )));
    }
    if params.n_init == 0 || params.max_iter == 0 {
        return Err(PipelineError::computation(
            "n_init and max_iter must both be positive",
        ));
    }

    let tol = scaled_tolerance(data, params.tolerance);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansFit> = None;

    for run in 0..params.n_init {
        let init = kmeans_plus_plus(data, k, &mut rng);
        let candidate = lloyd(data, init, params.max_iter, tol);
        debug!(
            "k={} run {}/{}: inertia={:.6} after {} iterations",
            k,
            run + 1,
            params.n_init,
            candidate.inertia,
            candidate.n_iter
        );
        match &best {
            Some(current) if current.inertia <= candidate.inertia => {}
            _ => best = Some(candidate),
        }
    }

    best.ok_or_else(|| PipelineError::computation("k-means produced no run"))
}

/// Index of the nearest centroid and its squared distance. Ties go to the lower index.
pub fn nearest_centroid(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for (j, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best.1 {
            best = (j, dist);
        }
    }
    best
}

pub fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn scaled_tolerance(data: ArrayView2<'_, f64>, tolerance: f64) -> f64 {
    if data.nrows() == 0 {
        return 0.0;
    }
    let variances = data.var_axis(Axis(0), 0.0);
    variances.mean().unwrap_or(0.0) * tolerance
}

/// k-means++ seeding: first centre uniform, later centres drawn with
/// probability proportional to squared distance from the nearest chosen centre.
fn kmeans_plus_plus(data: ArrayView2<'_, f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let d = data.ncols();
    let mut centroids = Array2::<f64>::zeros((k, d));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    let mut closest: Vec<f64> = data
        .axis_iter(Axis(0))
        .map(|p| squared_distance(p, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for (i, w) in closest.iter().enumerate() {
                if *w <= 0.0 {
                    continue;
                }
                acc += w;
                pick = Some(i);
                if acc >= target {
                    break;
                }
            }
            pick.unwrap_or(0)
        } else {
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for (i, p) in data.axis_iter(Axis(0)).enumerate() {
            let dist = squared_distance(p, centroids.row(c));
            if dist < closest[i] {
                closest[i] = dist;
            }
        }
    }
    centroids
}

fn lloyd(
    data: ArrayView2<'_, f64>,
    mut centroids: Array2<f64>,
    max_iter: usize,
    tol: f64,
) -> KMeansFit {
    let n = data.nrows();
    let k = centroids.nrows();
    let d = data.ncols();
    let mut labels = vec![0usize; n];
    let mut distances = vec![0.0f64; n];
    let mut n_iter = max_iter;

    for iter in 1..=max_iter {
        for (i, p) in data.axis_iter(Axis(0)).enumerate() {
            let (label, dist) = nearest_centroid(p, &centroids);
            labels[i] = label;
            distances[i] = dist;
        }

        let mut sums = Array2::<f64>::zeros((k, d));
        let mut counts = vec![0usize; k];
        for (i, p) in data.axis_iter(Axis(0)).enumerate() {
            let mut row = sums.row_mut(labels[i]);
            row += &p;
            counts[labels[i]] += 1;
        }

        let mut updated = centroids.clone();
        let mut relocated: Vec<usize> = Vec::new();
        for j in 0..k {
            if counts[j] > 0 {
                let mean = &sums.row(j) / counts[j] as f64;
                updated.row_mut(j).assign(&mean);
            } else if let Some(far) = farthest_unused(&distances, &relocated) {
                // empty cluster: restart it on the worst-served point
                relocated.push(far);
                updated.row_mut(j).assign(&data.row(far));
            }
        }

        let shift: f64 = (&updated - &centroids).mapv(|v| v * v).sum();
        centroids = updated;
        if shift <= tol && relocated.is_empty() {
            n_iter = iter;
            break;
        }
    }

    let mut inertia = 0.0;
    for (i, p) in data.axis_iter(Axis(0)).enumerate() {
        let (label, dist) = nearest_centroid(p, &centroids);
        labels[i] = label;
        inertia += dist;
    }

    KMeansFit {
        centroids,
        labels,
        inertia,
        n_iter,
    }
}

fn farthest_unused(distances: &[f64], used: &[usize]) -> Option<usize> {
    distances
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .fold(None, |best: Option<(usize, f64)>, (i, &dist)| match best {
            Some((_, best_dist)) if best_dist >= dist => best,
            _ => Some((i, dist)),
        })
        .map(|(i, _)| i)
}
