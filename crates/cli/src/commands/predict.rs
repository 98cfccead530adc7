//! `purifier predict`: estimate AQI and decide the fan power

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use purifier_lib::{AqiCategory, Conditions, FeatureInput, FeatureVector};
use serde::Serialize;
use std::collections::HashMap;

use super::{current_hour, Context};
use crate::output::{color_aqi, color_category, format_currency, format_power, OutputFormat};

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// All ten readings in order: pm25,pm10,no2,so2,co,o3,temperature,humidity,wind_speed,traffic_density
    #[arg(long, value_delimiter = ',', num_args = 1.., allow_negative_numbers = true, conflicts_with_all = [
        "pm25", "pm10", "no2", "so2", "co", "o3",
        "temperature", "humidity", "wind_speed", "traffic_density",
    ])]
    pub features: Option<Vec<f64>>,

    #[arg(long)]
    pub pm25: Option<f64>,
    #[arg(long)]
    pub pm10: Option<f64>,
    #[arg(long)]
    pub no2: Option<f64>,
    #[arg(long)]
    pub so2: Option<f64>,
    #[arg(long)]
    pub co: Option<f64>,
    #[arg(long)]
    pub o3: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: Option<f64>,
    #[arg(long)]
    pub humidity: Option<f64>,
    #[arg(long)]
    pub wind_speed: Option<f64>,
    #[arg(long)]
    pub traffic_density: Option<f64>,

    /// Hour of day used for the night adjustment (defaults to the local hour)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
    pub hour: Option<u8>,
}

impl PredictArgs {
    /// Ordered input when `--features` is given, otherwise the named flags
    pub fn feature_input(&self) -> FeatureInput {
        if let Some(values) = &self.features {
            return FeatureInput::Ordered(values.clone());
        }

        let named = [
            ("pm25", self.pm25),
            ("pm10", self.pm10),
            ("no2", self.no2),
            ("so2", self.so2),
            ("co", self.co),
            ("o3", self.o3),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("wind_speed", self.wind_speed),
            ("traffic_density", self.traffic_density),
        ];
        let keyed: HashMap<String, f64> = named
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
            .collect();
        FeatureInput::Keyed(keyed)
    }
}

#[derive(Debug, Serialize)]
struct PredictionReport {
    device_id: String,
    features: FeatureVector,
    aqi: f64,
    category: AqiCategory,
    hour: u8,
    power_level: f64,
    hourly_cost: f64,
}

pub fn run(ctx: &Context, args: PredictArgs) -> Result<()> {
    let input = args.feature_input();
    // Reject malformed input before any model is loaded or trained
    let features = FeatureVector::from_array(input.normalize().context("Invalid sensor readings")?);

    let estimator = ctx.open_estimator()?;
    let aqi = estimator
        .predict_input(&input)
        .context("AQI prediction failed")?;

    let hour = args.hour.unwrap_or_else(current_hour);
    let optimizer = ctx.optimizer();
    let category = optimizer.category_of(aqi);
    let power_level = optimizer.power_level(aqi, &Conditions::from_features(&features, hour));
    ctx.metrics.set_power_level(power_level);
    ctx.logger.log_decision(aqi, category, power_level, hour);

    let report = PredictionReport {
        device_id: ctx.logger.device_id().to_string(),
        features,
        aqi,
        category,
        hour,
        power_level,
        hourly_cost: optimizer.energy_cost(power_level, 1.0),
    };

    match ctx.format {
        OutputFormat::Json => crate::output::print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Air Quality".bold());
            println!("{}", "=".repeat(40));
            println!("Device:          {}", report.device_id.cyan());
            println!("AQI:             {}", color_aqi(report.aqi));
            println!("Category:        {}", color_category(report.category));
            println!();
            println!("{}", "Purifier".bold());
            println!("{}", "-".repeat(40));
            println!("Hour:            {:02}:00", report.hour);
            println!("Power level:     {}", format_power(report.power_level));
            println!("Cost per hour:   {}", format_currency(report.hourly_cost));
        }
    }
    Ok(())
}
