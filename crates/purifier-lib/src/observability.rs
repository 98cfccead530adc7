//! Observability infrastructure for the purifier
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction/training counters,
//!   restore outcomes, current power level) on an instance-owned registry
//! - Structured JSON logging of decisions with tracing

use crate::optimizer::{AqiCategory, ScheduleReport};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Prometheus metrics for estimation and power decisions
///
/// Each instance owns its registry, so separate estimators (and tests) never
/// collide on metric registration. Clones share the same underlying metrics.
#[derive(Clone)]
pub struct PurifierMetrics {
    registry: Registry,
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    training_runs_total: IntCounter,
    training_samples: IntGauge,
    restore_outcomes_total: IntCounterVec,
    power_level: Gauge,
}

impl PurifierMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "purifier_prediction_latency_seconds",
                "Time spent scaling features and evaluating the forest",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let predictions_total = IntCounter::new(
            "purifier_predictions_total",
            "Total number of AQI predictions served",
        )?;
        let prediction_errors_total = IntCounter::new(
            "purifier_prediction_errors_total",
            "Total number of rejected prediction requests",
        )?;
        let training_runs_total = IntCounter::new(
            "purifier_training_runs_total",
            "Total number of estimator fits",
        )?;
        let training_samples = IntGauge::new(
            "purifier_training_samples",
            "Number of samples the current model was fitted on",
        )?;
        let restore_outcomes_total = IntCounterVec::new(
            Opts::new(
                "purifier_restore_outcomes_total",
                "Model restore attempts by outcome",
            ),
            &["outcome"],
        )?;
        let power_level = Gauge::new(
            "purifier_power_level",
            "Most recently decided purifier power level (0-1)",
        )?;

        registry.register(Box::new(prediction_latency_seconds.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(prediction_errors_total.clone()))?;
        registry.register(Box::new(training_runs_total.clone()))?;
        registry.register(Box::new(training_samples.clone()))?;
        registry.register(Box::new(restore_outcomes_total.clone()))?;
        registry.register(Box::new(power_level.clone()))?;

        Ok(Self {
            registry,
            prediction_latency_seconds,
            predictions_total,
            prediction_errors_total,
            training_runs_total,
            training_samples,
            restore_outcomes_total,
            power_level,
        })
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.prediction_latency_seconds.observe(duration_secs);
        self.predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.prediction_errors_total.inc();
    }

    pub fn record_training(&self, samples: usize) {
        self.training_runs_total.inc();
        self.training_samples.set(samples as i64);
    }

    pub fn record_restore(&self, outcome: &str) {
        self.restore_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn set_power_level(&self, level: f64) {
        self.power_level.set(level);
    }

    pub fn predictions_total(&self) -> u64 {
        self.predictions_total.get()
    }

    pub fn prediction_errors_total(&self) -> u64 {
        self.prediction_errors_total.get()
    }

    pub fn training_runs_total(&self) -> u64 {
        self.training_runs_total.get()
    }

    pub fn restore_count(&self, outcome: &str) -> u64 {
        self.restore_outcomes_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for purifier decisions
///
/// Provides consistent JSON-formatted events for predictions, power
/// decisions, training runs and schedules.
#[derive(Clone)]
pub struct DecisionLogger {
    device_id: String,
}

impl DecisionLogger {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Log a prediction and the power decision derived from it
    pub fn log_decision(&self, aqi: f64, category: AqiCategory, power_level: f64, hour: u8) {
        match category {
            AqiCategory::VeryUnhealthy | AqiCategory::Hazardous => {
                warn!(
                    event = "power_decision",
                    device = %self.device_id,
                    aqi = aqi,
                    category = %category,
                    power_level = power_level,
                    hour = hour,
                    "Poor air quality, running purifier at high power"
                );
            }
            _ => {
                info!(
                    event = "power_decision",
                    device = %self.device_id,
                    aqi = aqi,
                    category = %category,
                    power_level = power_level,
                    hour = hour,
                    "Power level decided"
                );
            }
        }
    }

    pub fn log_training(&self, samples: usize, trees: usize, elapsed_ms: u128, persisted: bool) {
        info!(
            event = "model_trained",
            device = %self.device_id,
            samples = samples,
            trees = trees,
            elapsed_ms = elapsed_ms,
            persisted = persisted,
            "Estimator trained"
        );
    }

    pub fn log_restore(&self, restored: bool, detail: &str) {
        if restored {
            info!(
                event = "model_restored",
                device = %self.device_id,
                "Estimator restored from persisted state"
            );
        } else {
            warn!(
                event = "model_restore_failed",
                device = %self.device_id,
                detail = %detail,
                "No usable persisted state, falling back to bootstrap training"
            );
        }
    }

    pub fn log_schedule(&self, report: &ScheduleReport) {
        info!(
            event = "schedule_optimized",
            device = %self.device_id,
            total_energy_wh = report.total_energy_wh,
            total_cost = report.total_cost,
            mean_efficiency = report.mean_efficiency,
            "Daily schedule optimized"
        );
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "purifier_started",
            device = %self.device_id,
            version = %version,
            "Purifier controller started"
        );
    }
}
