// src/clustering/projection.rs

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use smartcore::decomposition::pca::{PCAParameters, PCA};
use smartcore::linalg::basic::arrays::{Array, Array2 as _};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::PipelineError;

/// Linear projection onto the leading principal components of the fitted data.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    mean: Array1<f64>,
    /// `n_components × d`, one unit-length component per row.
    components: Array2<f64>,
    pub explained_variance: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
}

impl Projection {
    /// Fits the top `n_components` principal axes of `data` with smartcore's
    /// covariance PCA. Each axis is oriented so its largest-magnitude loading
    /// is positive.
    pub fn fit(data: ArrayView2<'_, f64>, n_components: usize) -> Result<Self, PipelineError> {
        let n = data.nrows();
        let d = data.ncols();
        if n == 0 {
            return Err(PipelineError::computation("cannot project an empty matrix"));
        }
        if n_components == 0 || n_components > d {
            return Err(PipelineError::computation(format!(
                "cannot take {} components from {} features",
                n_components, d
            )));
        }

        let matrix = DenseMatrix::from_iterator(data.iter().copied(), n, d, 0);
        let parameters = PCAParameters::default().with_n_components(n_components);
        let pca = PCA::<f64, DenseMatrix<f64>>::fit(&matrix, parameters)
            .map_err(|e| PipelineError::computation(format!("PCA fit failed: {}", e)))?;

        // smartcore keeps one component per column (`d × n_components`)
        let fitted = pca.components();
        if fitted.shape() != (d, n_components) {
            return Err(PipelineError::computation(format!(
                "PCA returned components of shape {:?}, expected {:?}",
                fitted.shape(),
                (d, n_components)
            )));
        }
        let mut components = Array2::<f64>::zeros((n_components, d));
        for k in 0..n_components {
            for j in 0..d {
                components[[k, j]] = *fitted.get((j, k));
            }
        }
        for mut axis in components.rows_mut() {
            let pivot = axis
                .iter()
                .copied()
                .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                axis.mapv_inplace(|v| -v);
            }
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::computation("cannot project an empty matrix"))?;
        let centered = &data - &mean;
        let ddof = if n > 1 { (n - 1) as f64 } else { 1.0 };
        let coords = centered.dot(&components.t());
        let explained_variance: Vec<f64> = coords
            .axis_iter(Axis(1))
            .map(|col| col.iter().map(|v| v * v).sum::<f64>() / ddof)
            .collect();
        let total_variance: f64 = centered.iter().map(|v| v * v).sum::<f64>() / ddof;
        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
            .collect::<Vec<_>>();
        debug!(
            "Projection fitted: explained variance ratio {:?}",
            explained_variance_ratio
        );

        Ok(Self {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// Maps rows of `data` into component coordinates (`n × n_components`).
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        (&data - &self.mean).dot(&self.components.t())
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }
}
