//! `purifier train`: retrain on fresh synthetic data and persist

use anyhow::{Context as _, Result};
use colored::Colorize;
use purifier_lib::predictor::retrain;
use serde::Serialize;
use std::time::Instant;

use super::Context;
use crate::output::{print_success, print_warning, OutputFormat};

#[derive(Debug, Serialize)]
struct TrainingReport {
    samples: usize,
    trees: usize,
    seed: u64,
    persisted: bool,
    model_dir: String,
    trained_at: Option<String>,
}

pub fn run(ctx: &Context) -> Result<()> {
    let store = ctx.store();
    let mut estimator = ctx.estimator();

    let start = Instant::now();
    let summary = retrain(&mut estimator, &store, &ctx.config.bootstrap)
        .context("Synthetic training failed")?;
    ctx.log_training(summary.samples, summary.persisted, &estimator, start);

    let metadata = estimator.metadata();
    let report = TrainingReport {
        samples: summary.samples,
        trees: metadata.map(|m| m.trees).unwrap_or(0),
        seed: ctx.config.bootstrap.seed,
        persisted: summary.persisted,
        model_dir: ctx.config.model_dir.display().to_string(),
        trained_at: metadata.map(|m| m.trained_at.to_rfc3339()),
    };

    match ctx.format {
        OutputFormat::Json => crate::output::print_json(&report)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Trained {} trees on {} synthetic samples (seed {})",
                report.trees, report.samples, report.seed
            ));
            if report.persisted {
                println!("Saved to:          {}", report.model_dir.cyan());
            } else {
                print_warning("Model could not be saved; it was used in memory only");
            }
        }
    }
    Ok(())
}
