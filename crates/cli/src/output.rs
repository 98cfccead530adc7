//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use purifier_lib::AqiCategory;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a power level as a percentage of full fan speed
pub fn format_power(level: f64) -> String {
    format!("{:.0}%", level * 100.0)
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    if amount < 0.01 && amount > 0.0 {
        format!("${:.4}", amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Color a category label by severity
pub fn color_category(category: AqiCategory) -> String {
    let label = category.label();
    match category {
        AqiCategory::Good => label.green().to_string(),
        AqiCategory::Moderate => label.yellow().to_string(),
        AqiCategory::Unhealthy => label.bright_red().to_string(),
        AqiCategory::VeryUnhealthy => label.red().to_string(),
        AqiCategory::Hazardous => label.red().bold().to_string(),
    }
}

/// Color an AQI value by the category it falls into
pub fn color_aqi(aqi: f64) -> String {
    let formatted = format!("{:.1}", aqi);
    match AqiCategory::from_aqi(aqi) {
        AqiCategory::Good => formatted.green().to_string(),
        AqiCategory::Moderate => formatted.yellow().to_string(),
        _ => formatted.red().to_string(),
    }
}
