// src/analysis/correlation.rs

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::models::{FeatureKind, FeatureSet};

/// Pairwise Pearson correlations between the selected features.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub features: Vec<FeatureKind>,
    /// Symmetric `d × d`, unit diagonal. `NaN` where a feature has zero variance.
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: FeatureKind, b: FeatureKind) -> Option<f64> {
        let i = self.features.iter().position(|k| *k == a)?;
        let j = self.features.iter().position(|k| *k == b)?;
        Some(self.values[[i, j]])
    }
}

pub fn pearson_matrix(raw: ArrayView2<'_, f64>, features: &FeatureSet) -> CorrelationMatrix {
    let d = raw.ncols();
    let mut values = Array2::<f64>::zeros((d, d));
    for i in 0..d {
        values[[i, i]] = 1.0;
        for j in (i + 1)..d {
            let r = pearson(raw.index_axis(Axis(1), i), raw.index_axis(Axis(1), j));
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }
    debug!("Correlation matrix:\n{:.3}", values);
    CorrelationMatrix {
        features: features.kinds().to_vec(),
        values,
    }
}

fn pearson(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = x.sum() / n as f64;
    let mean_y = y.sum() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (cov / denom).clamp(-1.0, 1.0)
}
