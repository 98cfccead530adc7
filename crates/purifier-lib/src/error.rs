//! Error types for estimation, optimization and model persistence

use std::path::PathBuf;
use thiserror::Error;

/// Input did not have the shape an operation requires
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputShapeError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("missing feature field: {0}")]
    MissingField(&'static str),
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("schedule pattern must cover {expected} hours, got {actual}")]
    ScheduleLength { expected: usize, actual: usize },
}

/// Failure while reading or writing persisted model state
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialize model state: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("persisted state is incomplete: {missing} blob is missing")]
    Incomplete { missing: &'static str },
    #[error("scaler was written for model {expected}, found model {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("persisted state is incompatible: {0}")]
    Incompatible(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error surfaced by the estimator and optimizer
#[derive(Debug, Error)]
pub enum AqiError {
    #[error("invalid input shape: {0}")]
    InputShape(#[from] InputShapeError),
    #[error("model has not been fitted or restored")]
    UntrainedModel,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type AqiResult<T> = Result<T, AqiError>;
