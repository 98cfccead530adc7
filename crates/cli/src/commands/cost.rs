//! `purifier cost`: energy cost of running at a given power level

use anyhow::{ensure, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::Context;
use crate::output::{format_currency, format_power, OutputFormat};

#[derive(Debug, Args)]
pub struct CostArgs {
    /// Fan power level between 0 and 1
    #[arg(long)]
    pub power_level: f64,

    /// Running time in hours
    #[arg(long, default_value_t = 1.0)]
    pub hours: f64,

    /// Electricity price per kWh (defaults to the configured rate)
    #[arg(long)]
    pub rate: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CostReport {
    power_level: f64,
    hours: f64,
    rate_per_kwh: f64,
    energy_kwh: f64,
    cost: f64,
}

pub fn run(ctx: &Context, args: CostArgs) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&args.power_level),
        "power level must be between 0 and 1, got {}",
        args.power_level
    );
    ensure!(args.hours >= 0.0, "duration must not be negative");

    let optimizer = ctx.optimizer();
    let rate = args.rate.unwrap_or(optimizer.config().rate_per_kwh);
    let report = CostReport {
        power_level: args.power_level,
        hours: args.hours,
        rate_per_kwh: rate,
        energy_kwh: optimizer.config().max_draw_kw * args.power_level * args.hours,
        cost: optimizer.energy_cost_at_rate(args.power_level, args.hours, rate),
    };

    match ctx.format {
        OutputFormat::Json => crate::output::print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Energy Cost".bold());
            println!("{}", "=".repeat(40));
            println!("Power level:     {}", format_power(report.power_level));
            println!("Duration:        {:.1} h", report.hours);
            println!("Rate:            {}/kWh", format_currency(report.rate_per_kwh));
            println!("Energy:          {:.3} kWh", report.energy_kwh);
            println!("Cost:            {}", format_currency(report.cost).green());
        }
    }
    Ok(())
}
