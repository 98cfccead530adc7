//! Smart purifier core library
//!
//! This crate provides the core functionality for:
//! - AQI estimation from ten sensor features (scaler + random forest)
//! - Bootstrap training on synthetic data and model persistence
//! - Purifier power optimization and 24-hour scheduling
//! - Metrics and structured decision logging

pub mod error;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod predictor;
pub mod store;

pub use error::{AqiError, AqiResult, InputShapeError, PersistenceError};
pub use models::*;
pub use observability::{DecisionLogger, PurifierMetrics};
pub use optimizer::{
    category_of, AqiCategory, Conditions, DailySchedule, OptimizerConfig, PeakWindow,
    PurifierOptimizer, ScheduleReport,
};
pub use predictor::{AqiEstimator, ForestConfig, Predictor, RestoreOutcome, SyntheticGenerator};
pub use store::{FileModelStore, MemoryModelStore, ModelStore};
