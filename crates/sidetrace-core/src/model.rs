//! Power-model boundary
//!
//! Models consume an encoded feature table and produce one power estimate
//! per row. Training and serialization of learned models (boosted trees,
//! neural networks) happen outside this crate; the trait pins down the
//! surface the rest of the pipeline depends on, and the Hamming-weight
//! model gives a closed-form reference implementation.

use std::path::Path;

use crate::encoder::{FeatureMatrix, FeatureSchema};
use crate::types::ScaResult;

/// Common interface for power models.
pub trait Model {
    /// Predict one power value per feature row.
    fn predict(&self, features: &FeatureMatrix) -> ScaResult<Vec<f64>>;

    /// Fit the model on dataset files.
    fn fit(&mut self, data_files: &[std::path::PathBuf]) -> ScaResult<()>;

    /// Persist the model.
    fn save(&self, path: &Path) -> ScaResult<()>;

    /// Coefficient of determination between predictions and a target.
    ///
    /// `1 - SSE/SST`; use features held out from training.
    fn r_square(&self, features: &FeatureMatrix, target: &[f64]) -> ScaResult<f64> {
        let predicted = self.predict(features)?;
        let sse: f64 = predicted
            .iter()
            .zip(target)
            .map(|(p, t)| (p - t) * (p - t))
            .sum();
        let mean = target.iter().sum::<f64>() / target.len() as f64;
        let sst: f64 = target.iter().map(|t| (t - mean) * (t - mean)).sum();
        Ok(1.0 - sse / sst)
    }
}

/// Hamming-weight power model.
///
/// Models power consumption as the Hamming weight of the second operand of
/// the current instruction. Nothing to train or persist; `fit` and `save`
/// are no-ops.
#[derive(Debug, Clone, Default)]
pub struct HammingWeightModel;

impl HammingWeightModel {
    pub fn new() -> Self {
        Self
    }
}

impl Model for HammingWeightModel {
    fn predict(&self, features: &FeatureMatrix) -> ScaResult<Vec<f64>> {
        features.sum_columns(&FeatureSchema::bit_columns("op2_value_current"))
    }

    fn fit(&mut self, _data_files: &[std::path::PathBuf]) -> ScaResult<()> {
        Ok(())
    }

    fn save(&self, _path: &Path) -> ScaResult<()> {
        Ok(())
    }
}
