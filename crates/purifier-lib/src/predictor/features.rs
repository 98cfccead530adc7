//! Feature scaling for ML inference
//!
//! Standardizes each sensor feature to zero mean and unit variance using
//! statistics learned from the training set. The same transform is applied
//! at prediction time, so the scaler is persisted alongside the model.

use crate::error::InputShapeError;
use crate::models::{FeatureArray, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Per-feature standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: FeatureArray,
    scale: FeatureArray,
}

impl StandardScaler {
    /// Learn mean and population standard deviation for every feature
    pub fn fit(rows: &[FeatureArray]) -> Result<Self, InputShapeError> {
        if rows.is_empty() {
            return Err(InputShapeError::EmptyTrainingSet);
        }

        let n = rows.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];

        for j in 0..FEATURE_COUNT {
            let column_mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - column_mean).powi(2)).sum::<f64>() / n;
            mean[j] = column_mean;
            scale[j] = handle_zero_scale(var.sqrt());
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, features: &FeatureArray) -> FeatureArray {
        let mut out = [0.0; FEATURE_COUNT];
        for (j, slot) in out.iter_mut().enumerate() {
            *slot = (features[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn transform_all(&self, rows: &[FeatureArray]) -> Vec<FeatureArray> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn mean(&self) -> &FeatureArray {
        &self.mean
    }

    pub fn scale(&self) -> &FeatureArray {
        &self.scale
    }

    /// Check parameters decoded from storage before they are trusted
    pub(crate) fn is_valid(&self) -> bool {
        self.mean.iter().all(|m| m.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s > 0.0)
    }
}

/// Constant features keep a unit scale so they transform to zero
fn handle_zero_scale(std_dev: f64) -> f64 {
    if std_dev < f64::EPSILON {
        1.0
    } else {
        std_dev
    }
}
