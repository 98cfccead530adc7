//! ML prediction engine
//!
//! Turns the ten sensor features into a bounded AQI estimate: features are
//! standardized, fed through a random forest regressor, and the result is
//! clamped to [0, 500].

mod bootstrap;
mod estimator;
mod features;
mod forest;
mod synthetic;

pub use bootstrap::{initialize, retrain, BootstrapOutcome, StatePrecondition, TrainingSummary};
pub use estimator::{clamp_aqi, AqiEstimator, ModelMetadata, RestoreOutcome, AQI_MAX, AQI_MIN};
pub use features::StandardScaler;
pub use forest::{ForestConfig, RandomForestRegressor, RegressionTree};
pub use synthetic::{
    synthetic_aqi, SyntheticGenerator, DEFAULT_SYNTHETIC_SAMPLES, DEFAULT_SYNTHETIC_SEED,
};

use crate::error::AqiResult;
use crate::models::FeatureInput;

/// Trait for AQI prediction implementations
pub trait Predictor: Send + Sync {
    /// Predict a clamped AQI from one feature input
    fn predict(&self, features: FeatureInput) -> AqiResult<f64>;

    /// Whether fitted or restored state is available
    fn is_trained(&self) -> bool;
}
