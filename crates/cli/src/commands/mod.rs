//! Subcommand implementations

pub mod cost;
pub mod predict;
pub mod schedule;
pub mod train;

use anyhow::{Context as _, Result};
use chrono::Timelike;
use purifier_lib::predictor::{initialize, BootstrapOutcome, StatePrecondition};
use purifier_lib::{
    AqiEstimator, DecisionLogger, FileModelStore, PurifierMetrics, PurifierOptimizer,
};
use std::time::Instant;

use crate::config::PurifierConfig;
use crate::output::OutputFormat;

/// Everything a subcommand needs, built once in `main`
pub struct Context {
    pub config: PurifierConfig,
    pub format: OutputFormat,
    pub metrics: PurifierMetrics,
    pub logger: DecisionLogger,
}

impl Context {
    pub fn store(&self) -> FileModelStore {
        FileModelStore::new(&self.config.model_dir)
    }

    pub fn optimizer(&self) -> PurifierOptimizer {
        PurifierOptimizer::with_config(self.config.optimizer.clone())
    }

    /// Untrained estimator wired to the shared metrics
    pub fn estimator(&self) -> AqiEstimator {
        AqiEstimator::new(self.config.forest.clone()).with_metrics(self.metrics.clone())
    }

    /// Restore the persisted model, bootstrapping a new one if needed
    pub fn open_estimator(&self) -> Result<AqiEstimator> {
        let store = self.store();
        let mut estimator = self.estimator();
        let precondition = StatePrecondition::probe(&store);

        let start = Instant::now();
        let outcome = initialize(&mut estimator, &store, precondition, &self.config.bootstrap)
            .context("Failed to initialize the AQI estimator")?;
        self.log_outcome(&outcome, &estimator, start);
        Ok(estimator)
    }

    fn log_outcome(&self, outcome: &BootstrapOutcome, estimator: &AqiEstimator, start: Instant) {
        match outcome {
            BootstrapOutcome::Restored => {
                self.logger
                    .log_restore(true, &self.config.model_dir.display().to_string());
            }
            BootstrapOutcome::Trained {
                samples,
                persisted,
                restore_failure,
            } => {
                if let Some(reason) = restore_failure {
                    self.logger.log_restore(false, reason);
                }
                self.log_training(*samples, *persisted, estimator, start);
            }
        }
    }

    pub fn log_training(
        &self,
        samples: usize,
        persisted: bool,
        estimator: &AqiEstimator,
        start: Instant,
    ) {
        let trees = estimator.metadata().map(|m| m.trees).unwrap_or(0);
        self.logger
            .log_training(samples, trees, start.elapsed().as_millis(), persisted);
    }
}

/// Local wall-clock hour, 0-23
pub fn current_hour() -> u8 {
    chrono::Local::now().hour() as u8
}
