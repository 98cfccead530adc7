//! AQI estimator: scaler + random forest behind a single predict call
//!
//! The estimator owns its fitted state explicitly. It performs no internal
//! locking: callers that share an instance must serialize `fit`/`restore`
//! against `predict` themselves (e.g. behind an `RwLock`).

use super::features::StandardScaler;
use super::forest::{ForestConfig, RandomForestRegressor};
use super::Predictor;
use crate::error::{AqiError, AqiResult, InputShapeError, PersistenceError};
use crate::models::{FeatureArray, FeatureInput, TrainingSample};
use crate::observability::PurifierMetrics;
use crate::store::{compute_checksum, ModelStore, StoredBlobs};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lower bound of every AQI the estimator returns
pub const AQI_MIN: f64 = 0.0;
/// Upper bound of every AQI the estimator returns
pub const AQI_MAX: f64 = 500.0;

/// Version tag written into both persisted blobs
const FORMAT_VERSION: u32 = 1;

/// Facts about the currently fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub samples: usize,
    pub trees: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelBlob {
    format_version: u32,
    metadata: ModelMetadata,
    forest: RandomForestRegressor,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScalerBlob {
    format_version: u32,
    /// SHA-256 of the model blob this scaler was fitted with
    model_checksum: String,
    scaler: StandardScaler,
}

#[derive(Debug, Clone)]
struct TrainedState {
    forest: RandomForestRegressor,
    scaler: StandardScaler,
    metadata: ModelMetadata,
}

/// Result of [`AqiEstimator::restore`]; restore never fails with an error
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// Persisted state was loaded and replaced the in-memory state
    Restored,
    /// Nothing has been persisted yet
    NotFound,
    /// Persisted state exists but is unusable; in-memory state is unchanged
    Rejected(String),
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, RestoreOutcome::Restored)
    }

    fn metric_label(&self) -> &'static str {
        match self {
            RestoreOutcome::Restored => "restored",
            RestoreOutcome::NotFound => "not_found",
            RestoreOutcome::Rejected(_) => "rejected",
        }
    }
}

/// Predicts AQI from the ten sensor features
#[derive(Clone)]
pub struct AqiEstimator {
    config: ForestConfig,
    state: Option<TrainedState>,
    metrics: Option<PurifierMetrics>,
}

impl Default for AqiEstimator {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl AqiEstimator {
    /// Create an untrained estimator; call `fit` or `restore` before predicting
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            state: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PurifierMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.state.as_ref().map(|s| &s.metadata)
    }

    /// Fit scaler and forest on `samples`, replacing any previous state
    pub fn fit(&mut self, samples: &[TrainingSample]) -> AqiResult<()> {
        if samples.is_empty() {
            return Err(InputShapeError::EmptyTrainingSet.into());
        }

        let start = Instant::now();
        let features: Vec<FeatureArray> = samples.iter().map(|s| s.features).collect();
        let labels: Vec<f64> = samples.iter().map(|s| s.aqi).collect();

        let scaler = StandardScaler::fit(&features)?;
        let scaled = scaler.transform_all(&features);
        let forest = RandomForestRegressor::fit(&scaled, &labels, &self.config)?;

        let metadata = ModelMetadata {
            trained_at: Utc::now(),
            samples: samples.len(),
            trees: forest.n_trees(),
        };
        self.state = Some(TrainedState {
            forest,
            scaler,
            metadata,
        });

        if let Some(metrics) = &self.metrics {
            metrics.record_training(samples.len());
        }
        info!(
            samples = samples.len(),
            trees = self.config.n_estimators,
            max_depth = self.config.max_depth,
            elapsed_ms = start.elapsed().as_millis(),
            "Estimator fitted"
        );
        Ok(())
    }

    /// Predict AQI for one feature input, clamped to [0, 500]
    pub fn predict(&self, features: impl Into<FeatureInput>) -> AqiResult<f64> {
        self.predict_input(&features.into())
    }

    pub fn predict_input(&self, features: &FeatureInput) -> AqiResult<f64> {
        let result = self.predict_unrecorded(features);
        if let Some(metrics) = &self.metrics {
            match &result {
                Ok((_, elapsed)) => metrics.observe_prediction_latency(*elapsed),
                Err(_) => metrics.inc_prediction_errors(),
            }
        }
        result.map(|(aqi, _)| aqi)
    }

    fn predict_unrecorded(&self, features: &FeatureInput) -> AqiResult<(f64, f64)> {
        let state = self.state.as_ref().ok_or(AqiError::UntrainedModel)?;
        let start = Instant::now();

        let ordered = features.normalize()?;
        let scaled = state.scaler.transform(&ordered);
        let raw = state.forest.predict(&scaled);
        let aqi = clamp_aqi(raw);

        let elapsed = start.elapsed();
        debug!(
            raw = raw,
            aqi = aqi,
            elapsed_us = elapsed.as_micros(),
            "Inference completed"
        );
        Ok((aqi, elapsed.as_secs_f64()))
    }

    /// Write model and scaler to `store` as a bound pair; returns the model checksum
    ///
    /// In-memory state is untouched whether or not the write succeeds.
    pub fn persist(&self, store: &dyn ModelStore) -> AqiResult<String> {
        let state = self.state.as_ref().ok_or(AqiError::UntrainedModel)?;

        let model = serde_json::to_vec(&ModelBlob {
            format_version: FORMAT_VERSION,
            metadata: state.metadata.clone(),
            forest: state.forest.clone(),
        })
        .map_err(PersistenceError::from)?;
        let checksum = compute_checksum(&model);
        let scaler = serde_json::to_vec(&ScalerBlob {
            format_version: FORMAT_VERSION,
            model_checksum: checksum.clone(),
            scaler: state.scaler.clone(),
        })
        .map_err(PersistenceError::from)?;

        store.save(&StoredBlobs { model, scaler })?;
        info!(checksum = %checksum, trees = state.metadata.trees, "Model state persisted");
        Ok(checksum)
    }

    /// Load model and scaler from `store`
    ///
    /// Any failure leaves the current state as it was and is reported in the
    /// outcome; callers typically fall back to bootstrap training.
    pub fn restore(&mut self, store: &dyn ModelStore) -> RestoreOutcome {
        let outcome = match store.load() {
            Ok(None) => RestoreOutcome::NotFound,
            Ok(Some(blobs)) => match decode_state(&blobs) {
                Ok(state) => {
                    info!(
                        trees = state.metadata.trees,
                        samples = state.metadata.samples,
                        trained_at = %state.metadata.trained_at,
                        "Model state restored"
                    );
                    self.state = Some(state);
                    RestoreOutcome::Restored
                }
                Err(e) => RestoreOutcome::Rejected(e.to_string()),
            },
            Err(e) => RestoreOutcome::Rejected(e.to_string()),
        };

        if let RestoreOutcome::Rejected(reason) = &outcome {
            warn!(reason = %reason, "Persisted model state rejected");
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_restore(outcome.metric_label());
        }
        outcome
    }
}

impl Predictor for AqiEstimator {
    fn predict(&self, features: FeatureInput) -> AqiResult<f64> {
        self.predict_input(&features)
    }

    fn is_trained(&self) -> bool {
        self.state.is_some()
    }
}

/// Clamp a raw model output to the valid AQI band
pub fn clamp_aqi(raw: f64) -> f64 {
    if raw.is_nan() {
        return AQI_MIN;
    }
    raw.clamp(AQI_MIN, AQI_MAX)
}

fn decode_state(blobs: &StoredBlobs) -> Result<TrainedState, PersistenceError> {
    let model: ModelBlob = serde_json::from_slice(&blobs.model)?;
    let scaler: ScalerBlob = serde_json::from_slice(&blobs.scaler)?;

    if model.format_version != FORMAT_VERSION || scaler.format_version != FORMAT_VERSION {
        return Err(PersistenceError::Incompatible(format!(
            "format versions model={} scaler={}, expected {}",
            model.format_version, scaler.format_version, FORMAT_VERSION
        )));
    }

    let checksum = compute_checksum(&blobs.model);
    if scaler.model_checksum != checksum {
        return Err(PersistenceError::ChecksumMismatch {
            expected: scaler.model_checksum,
            actual: checksum,
        });
    }

    if !model.forest.is_well_formed() {
        return Err(PersistenceError::Incompatible(
            "forest structure is malformed".to_string(),
        ));
    }
    if !scaler.scaler.is_valid() {
        return Err(PersistenceError::Incompatible(
            "scaler parameters are not finite".to_string(),
        ));
    }

    Ok(TrainedState {
        forest: model.forest,
        scaler: scaler.scaler,
        metadata: model.metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::SyntheticGenerator;
    use crate::store::MemoryModelStore;

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 8,
            max_depth: 6,
            ..Default::default()
        }
    }

    fn trained() -> AqiEstimator {
        let mut estimator = AqiEstimator::new(small_config());
        estimator
            .fit(&SyntheticGenerator::new(200, 42).generate())
            .unwrap();
        estimator
    }

    #[test]
    fn test_predict_before_fit_is_untrained_error() {
        let estimator = AqiEstimator::default();
        assert!(!estimator.is_trained());
        assert!(matches!(
            estimator.predict([0.0; 10]),
            Err(AqiError::UntrainedModel)
        ));
    }

    #[test]
    fn test_fit_empty_set_rejected() {
        let mut estimator = AqiEstimator::new(small_config());
        assert!(matches!(
            estimator.fit(&[]),
            Err(AqiError::InputShape(InputShapeError::EmptyTrainingSet))
        ));
        assert!(!estimator.is_trained());
    }

    #[test]
    fn test_wrong_feature_count_rejected() {
        let estimator = trained();
        assert!(matches!(
            estimator.predict(vec![1.0; 9]),
            Err(AqiError::InputShape(InputShapeError::FeatureCount { .. }))
        ));
    }

    #[test]
    fn test_prediction_is_clamped_and_repeatable() {
        let estimator = trained();
        let extreme = [1e6, 1e6, 1e6, 1e6, 1e6, 1e6, -500.0, 1e6, -1e6, 50.0];
        let a = estimator.predict(extreme).unwrap();
        let b = estimator.predict(extreme).unwrap();
        assert!((AQI_MIN..=AQI_MAX).contains(&a));
        assert_eq!(a, b);
    }

    #[test]
    fn test_refit_replaces_state() {
        let mut estimator = AqiEstimator::new(small_config());
        let high: Vec<TrainingSample> = (0..20)
            .map(|i| TrainingSample::new([i as f64; 10], 400.0).unwrap())
            .collect();
        let low: Vec<TrainingSample> = (0..20)
            .map(|i| TrainingSample::new([i as f64; 10], 10.0).unwrap())
            .collect();

        estimator.fit(&high).unwrap();
        assert_eq!(estimator.predict([5.0; 10]).unwrap(), 400.0);
        estimator.fit(&low).unwrap();
        assert_eq!(estimator.predict([5.0; 10]).unwrap(), 10.0);
    }

    #[test]
    fn test_persist_restore_roundtrip() {
        let estimator = trained();
        let store = MemoryModelStore::new();
        estimator.persist(&store).unwrap();

        let mut restored = AqiEstimator::new(small_config());
        assert_eq!(restored.restore(&store), RestoreOutcome::Restored);

        let probe = [35.0, 75.0, 45.0, 30.0, 1.2, 45.0, 25.0, 60.0, 3.0, 0.5];
        assert_eq!(
            estimator.predict(probe).unwrap(),
            restored.predict(probe).unwrap()
        );
        assert_eq!(restored.metadata(), estimator.metadata());
    }

    #[test]
    fn test_persist_untrained_fails() {
        let store = MemoryModelStore::new();
        assert!(matches!(
            AqiEstimator::default().persist(&store),
            Err(AqiError::UntrainedModel)
        ));
        assert!(!store.has_state());
    }

    #[test]
    fn test_restore_empty_store_keeps_state() {
        let mut estimator = trained();
        let before = estimator.predict([10.0; 10]).unwrap();
        assert_eq!(
            estimator.restore(&MemoryModelStore::new()),
            RestoreOutcome::NotFound
        );
        assert_eq!(estimator.predict([10.0; 10]).unwrap(), before);
    }

    #[test]
    fn test_restore_rejects_unpaired_scaler() {
        let first = trained();
        let mut second = AqiEstimator::new(ForestConfig {
            seed: 7,
            ..small_config()
        });
        second
            .fit(&SyntheticGenerator::new(150, 9).generate())
            .unwrap();

        let store_a = MemoryModelStore::new();
        let store_b = MemoryModelStore::new();
        first.persist(&store_a).unwrap();
        second.persist(&store_b).unwrap();

        // Scaler from another fit next to this model
        let foreign_scaler = store_b.load().unwrap().unwrap().scaler;
        store_a.replace_scaler(foreign_scaler);

        let mut estimator = AqiEstimator::new(small_config());
        match estimator.restore(&store_a) {
            RestoreOutcome::Rejected(reason) => assert!(reason.contains("scaler was written")),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(!estimator.is_trained());
    }

    #[test]
    fn test_restore_rejects_single_blob() {
        let store = MemoryModelStore::new();
        trained().persist(&store).unwrap();
        store.discard_scaler();

        let mut estimator = AqiEstimator::default();
        assert!(matches!(
            estimator.restore(&store),
            RestoreOutcome::Rejected(_)
        ));
        assert!(!estimator.is_trained());
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let store = MemoryModelStore::new();
        store
            .save(&StoredBlobs {
                model: b"not json".to_vec(),
                scaler: b"{}".to_vec(),
            })
            .unwrap();
        let mut estimator = AqiEstimator::default();
        assert!(!estimator.restore(&store).is_restored());
    }

    #[test]
    fn test_rejected_restore_keeps_trained_state() {
        let mut estimator = trained();
        let features = [60.0, 90.0, 40.0, 10.0, 2.0, 50.0, 29.0, 66.0, 4.0, 0.3];
        let before = estimator.predict(features).unwrap();
        let metadata = estimator.metadata().cloned();

        let garbage = MemoryModelStore::new();
        garbage
            .save(&StoredBlobs {
                model: b"not json".to_vec(),
                scaler: b"{}".to_vec(),
            })
            .unwrap();
        assert!(matches!(
            estimator.restore(&garbage),
            RestoreOutcome::Rejected(_)
        ));
        assert_eq!(estimator.predict(features).unwrap(), before);

        let mut other = AqiEstimator::new(ForestConfig {
            seed: 11,
            ..small_config()
        });
        other
            .fit(&SyntheticGenerator::new(120, 5).generate())
            .unwrap();
        let mismatched = MemoryModelStore::new();
        other.persist(&mismatched).unwrap();
        let own = MemoryModelStore::new();
        estimator.persist(&own).unwrap();
        mismatched.replace_scaler(own.load().unwrap().unwrap().scaler);

        assert!(matches!(
            estimator.restore(&mismatched),
            RestoreOutcome::Rejected(_)
        ));
        assert_eq!(estimator.predict(features).unwrap(), before);
        assert_eq!(estimator.metadata().cloned(), metadata);
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = PurifierMetrics::new().unwrap();
        let mut estimator = AqiEstimator::new(small_config()).with_metrics(metrics.clone());

        let _ = estimator.predict([1.0; 10]);
        assert_eq!(metrics.prediction_errors_total(), 1);

        estimator
            .fit(&SyntheticGenerator::new(100, 1).generate())
            .unwrap();
        estimator.predict([1.0; 10]).unwrap();
        assert_eq!(metrics.training_runs_total(), 1);
        assert_eq!(metrics.predictions_total(), 1);

        estimator.restore(&MemoryModelStore::new());
        assert_eq!(metrics.restore_count("not_found"), 1);
    }

    #[test]
    fn test_clamp_aqi() {
        assert_eq!(clamp_aqi(-3.0), 0.0);
        assert_eq!(clamp_aqi(612.0), 500.0);
        assert_eq!(clamp_aqi(f64::NAN), 0.0);
        assert_eq!(clamp_aqi(123.4), 123.4);
    }
}
