// src/clustering/normalizer.rs

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::errors::PipelineError;
use crate::models::FeatureSet;

/// Per-attribute standardisation parameters fitted on the working set.
/// Uses the population standard deviation (ddof 0); a constant attribute
/// keeps scale 1. Measured with the sample deviation (ddof 1), a scaled
/// column of `n` records has deviation `sqrt(n / (n - 1))` rather than 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl FeatureScaler {
    pub fn fit(raw: ArrayView2<'_, f64>) -> Result<Self, PipelineError> {
        if raw.ncols() < FeatureSet::MIN_FEATURES {
            return Err(PipelineError::data(format!(
                "need at least {} features to scale, got {}",
                FeatureSet::MIN_FEATURES,
                raw.ncols()
            )));
        }
        let mean = raw
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::data("cannot scale an empty working set"))?;

        let std = raw.std_axis(Axis(0), 0.0);
        for (idx, s) in std.iter().enumerate() {
            if *s < 1e-12 {
                warn!("Feature column {} is constant; it will not influence distances", idx);
            }
        }
        let scale = std.mapv(|s| if s < 1e-12 { 1.0 } else { s });
        debug!("Scaler fitted: mean={:.4}, scale={:.4}", mean, scale);

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, raw: ArrayView2<'_, f64>) -> Array2<f64> {
        (&raw - &self.mean) / &self.scale
    }

    pub fn inverse_transform(&self, scaled: ArrayView2<'_, f64>) -> Array2<f64> {
        &scaled * &self.scale + &self.mean
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

/// Fits a scaler on `raw` and returns it with the scaled matrix.
pub fn standardize(raw: ArrayView2<'_, f64>) -> Result<(FeatureScaler, Array2<f64>), PipelineError> {
    let scaler = FeatureScaler::fit(raw)?;
    let scaled = scaler.transform(raw);
    Ok((scaler, scaled))
}
