//! Estimator start-up: restore persisted state or train on synthetic data
//!
//! Whether trained state is available is an explicit input
//! ([`StatePrecondition`]) rather than something probed inside a
//! constructor, so callers decide when storage is consulted.

use super::estimator::{AqiEstimator, RestoreOutcome};
use super::synthetic::SyntheticGenerator;
use crate::error::AqiResult;
use crate::store::ModelStore;
use std::time::Instant;
use tracing::{info, warn};

/// Whether persisted trained state is expected to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePrecondition {
    Persisted,
    Absent,
}

impl StatePrecondition {
    /// Ask the store whether both blobs are present
    pub fn probe(store: &dyn ModelStore) -> Self {
        if store.has_state() {
            StatePrecondition::Persisted
        } else {
            StatePrecondition::Absent
        }
    }
}

/// How the estimator ended up trained
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Restored,
    Trained {
        samples: usize,
        /// Whether the freshly trained state reached the store
        persisted: bool,
        /// Why restoring was not possible, if it was attempted
        restore_failure: Option<String>,
    },
}

/// Result of a synthetic training run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingSummary {
    pub samples: usize,
    /// Whether the freshly trained state reached the store
    pub persisted: bool,
}

/// Bring `estimator` into a trained state
///
/// With [`StatePrecondition::Persisted`] the store is restored first; when
/// that is rejected, or when no state is expected, the estimator is trained
/// on synthetic data and the result is persisted. Persist failures are
/// logged and reported in the outcome but never abort start-up.
pub fn initialize(
    estimator: &mut AqiEstimator,
    store: &dyn ModelStore,
    precondition: StatePrecondition,
    generator: &SyntheticGenerator,
) -> AqiResult<BootstrapOutcome> {
    let restore_failure = match precondition {
        StatePrecondition::Persisted => match estimator.restore(store) {
            RestoreOutcome::Restored => return Ok(BootstrapOutcome::Restored),
            RestoreOutcome::NotFound => Some("no persisted state found".to_string()),
            RestoreOutcome::Rejected(reason) => Some(reason),
        },
        StatePrecondition::Absent => None,
    };

    if let Some(reason) = &restore_failure {
        warn!(reason = %reason, "Falling back to bootstrap training");
    }
    let summary = train_synthetic(estimator, store, generator)?;
    Ok(BootstrapOutcome::Trained {
        samples: summary.samples,
        persisted: summary.persisted,
        restore_failure,
    })
}

/// Train on a fresh synthetic sample set and persist, ignoring stored state
pub fn retrain(
    estimator: &mut AqiEstimator,
    store: &dyn ModelStore,
    generator: &SyntheticGenerator,
) -> AqiResult<TrainingSummary> {
    train_synthetic(estimator, store, generator)
}

fn train_synthetic(
    estimator: &mut AqiEstimator,
    store: &dyn ModelStore,
    generator: &SyntheticGenerator,
) -> AqiResult<TrainingSummary> {
    let start = Instant::now();
    info!(
        samples = generator.samples,
        seed = generator.seed,
        "Initializing model with synthetic data"
    );

    let samples = generator.generate();
    estimator.fit(&samples)?;

    let persisted = match estimator.persist(store) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Failed to persist bootstrapped model, continuing in memory");
            false
        }
    };

    info!(
        samples = samples.len(),
        persisted = persisted,
        elapsed_ms = start.elapsed().as_millis(),
        "Bootstrap training complete"
    );
    Ok(TrainingSummary {
        samples: samples.len(),
        persisted,
    })
}
