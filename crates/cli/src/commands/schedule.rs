//! `purifier schedule`: plan power for a 24-hour AQI forecast

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use purifier_lib::{PeakWindow, ScheduleReport};
use tabled::Tabled;

use super::Context;
use crate::output::{
    color_aqi, color_category, format_currency, format_power, print_info, print_table,
    OutputFormat,
};

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Expected AQI for each hour of the day, 24 comma-separated values
    #[arg(long, required = true, value_delimiter = ',', num_args = 1..)]
    pub aqi: Vec<f64>,

    /// Peak window as START-END (repeatable); defaults to the configured windows
    #[arg(long = "peak")]
    pub peaks: Vec<PeakWindow>,
}

/// Row for the hourly schedule table
#[derive(Tabled)]
struct HourRow {
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "AQI")]
    aqi: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Energy (Wh)")]
    energy: String,
    #[tabled(rename = "Cost")]
    cost: String,
}

pub fn run(ctx: &Context, args: ScheduleArgs) -> Result<()> {
    let peaks = if args.peaks.is_empty() {
        ctx.config.peak_windows.clone()
    } else {
        args.peaks
    };

    let optimizer = ctx.optimizer();
    let schedule = optimizer
        .optimize_schedule(&args.aqi, &peaks)
        .context("Cannot build a daily schedule")?;
    let report = optimizer.report(&schedule);
    ctx.logger.log_schedule(&report);

    match ctx.format {
        OutputFormat::Json => crate::output::print_json(&report)?,
        OutputFormat::Table => print_report(&report, &peaks),
    }
    Ok(())
}

fn print_report(report: &ScheduleReport, peaks: &[PeakWindow]) {
    let rows: Vec<HourRow> = report
        .hours
        .iter()
        .map(|h| HourRow {
            hour: format!("{:02}:00", h.hour),
            aqi: color_aqi(h.aqi),
            category: color_category(h.category),
            power: format_power(h.power_level),
            energy: format!("{:.1}", h.energy_wh),
            cost: format_currency(h.cost),
        })
        .collect();

    println!("{}", "Daily Schedule".bold());
    let windows: Vec<String> = peaks.iter().map(|w| w.to_string()).collect();
    print_info(&format!("Peak windows: {}", windows.join(", ")));
    print_table(&rows);

    println!();
    println!("Total energy:       {:.1} Wh", report.total_energy_wh);
    println!(
        "Total cost:         {}",
        format_currency(report.total_cost).green()
    );
    if let Some(mean) = report.mean_efficiency {
        println!("Mean efficiency:    {:.2}", mean);
    }
    if let (Some(best), Some(worst)) = (report.peak_efficiency_hour, report.lowest_efficiency_hour)
    {
        println!("Most efficient:     {:02}:00", best);
        println!("Least efficient:    {:02}:00", worst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ScheduleArgs,
    }

    #[test]
    fn test_parse_pattern_and_peaks() {
        let pattern = vec!["40"; 24].join(",");
        let harness = Harness::try_parse_from([
            "schedule", "--aqi", &pattern, "--peak", "7-10", "--peak", "16-19",
        ])
        .unwrap();
        assert_eq!(harness.args.aqi.len(), 24);
        assert_eq!(harness.args.peaks, PeakWindow::default_windows());
    }

    #[test]
    fn test_invalid_peak_rejected() {
        assert!(Harness::try_parse_from(["schedule", "--aqi", "40", "--peak", "7"]).is_err());
    }
}
