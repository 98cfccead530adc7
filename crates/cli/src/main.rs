//! Smart purifier controller CLI
//!
//! Estimates AQI from sensor readings, decides the purifier's power level
//! and plans daily schedules on top of `purifier-lib`.

mod commands;
mod config;
mod output;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use commands::{cost, predict, schedule, train, Context};
use purifier_lib::{DecisionLogger, PurifierMetrics};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Smart purifier controller
#[derive(Parser)]
#[command(name = "purifier")]
#[command(author, version, about = "Smart air purifier controller", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./purifier.toml when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Print Prometheus metrics after the command
    #[arg(long)]
    pub metrics: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate AQI from sensor readings and decide the power level
    Predict(predict::PredictArgs),

    /// Plan power levels for a 24-hour AQI forecast
    Schedule(schedule::ScheduleArgs),

    /// Retrain the estimator on synthetic data and save it
    Train,

    /// Estimate the energy cost of a power level
    Cost(cost::CostArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays parseable
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let config = config::PurifierConfig::load(cli.config.as_deref())?;
    info!(
        device_id = %config.device_id,
        model_dir = %config.model_dir.display(),
        trees = config.forest.n_estimators,
        peak_windows = config.peak_windows.len(),
        "Configuration loaded"
    );
    let metrics = PurifierMetrics::new().context("Failed to register metrics")?;
    let logger = DecisionLogger::new(config.device_id.clone());
    logger.log_startup(env!("CARGO_PKG_VERSION"));

    let ctx = Context {
        config,
        format: cli.format,
        metrics,
        logger,
    };

    match cli.command {
        Commands::Predict(args) => predict::run(&ctx, args)?,
        Commands::Schedule(args) => schedule::run(&ctx, args)?,
        Commands::Train => train::run(&ctx)?,
        Commands::Cost(args) => cost::run(&ctx, args)?,
    }

    if cli.metrics {
        let text = ctx.metrics.encode().context("Failed to encode metrics")?;
        println!("{}", text);
    }

    Ok(())
}
