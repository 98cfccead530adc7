//! Purifier power optimization
//!
//! Maps an AQI value plus ambient conditions to a power level, estimates the
//! energy cost of running at that level, and plans a 24-hour schedule. Every
//! operation is a pure function of its arguments and the optimizer config;
//! the current hour is an explicit input, never read from the clock.

mod category;
mod schedule;

pub use category::{
    AqiCategory, PowerTable, GOOD_MAX, MODERATE_MAX, UNHEALTHY_MAX, VERY_UNHEALTHY_MAX,
};
pub use schedule::{DailySchedule, HourlyUsage, PeakWindow, ScheduleReport, HOURS_PER_DAY};

use crate::error::InputShapeError;
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Humidity (%) above which the fan works harder
pub const HIGH_HUMIDITY: f64 = 70.0;
/// Temperature (°C) above which the fan works harder
pub const HIGH_TEMPERATURE: f64 = 30.0;
/// Traffic density above which the fan works harder
pub const HIGH_TRAFFIC: f64 = 0.7;

const HUMIDITY_FACTOR: f64 = 1.2;
const TEMPERATURE_FACTOR: f64 = 1.1;
const TRAFFIC_FACTOR: f64 = 1.15;
const NIGHT_FACTOR: f64 = 0.8;
const OFF_PEAK_FACTOR: f64 = 0.8;

/// Ambient context used to adjust the base power level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub humidity: f64,
    pub temperature: f64,
    pub traffic_density: f64,
    /// Hour of day, 0-23; larger values are taken modulo 24
    pub hour: u8,
}

impl Conditions {
    pub fn new(humidity: f64, temperature: f64, traffic_density: f64, hour: u8) -> Self {
        Self {
            humidity,
            temperature,
            traffic_density,
            hour,
        }
    }

    /// Take the ambient readings from the same sensor sample that was scored
    pub fn from_features(features: &FeatureVector, hour: u8) -> Self {
        Self {
            humidity: features.humidity,
            temperature: features.temperature,
            traffic_density: features.traffic_density,
            hour,
        }
    }
}

/// Tunables for the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub power_table: PowerTable,
    /// Electricity price used by [`PurifierOptimizer::energy_cost`]
    pub rate_per_kwh: f64,
    /// Draw at full power, in kW
    pub max_draw_kw: f64,
    /// First night hour (inclusive)
    pub night_start: u8,
    /// Last night hour (inclusive)
    pub night_end: u8,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            power_table: PowerTable::default(),
            rate_per_kwh: 0.12,
            max_draw_kw: 0.05,
            night_start: 22,
            night_end: 5,
        }
    }
}

/// Stateless rule engine turning AQI into power decisions
#[derive(Debug, Clone, Default)]
pub struct PurifierOptimizer {
    config: OptimizerConfig,
}

impl PurifierOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn category_of(&self, aqi: f64) -> AqiCategory {
        AqiCategory::from_aqi(aqi)
    }

    /// Whether `hour` falls in the night window (inclusive on both ends)
    ///
    /// Hours past 23 wrap around, so 24 is midnight and 30 is 06:00.
    pub fn is_night(&self, hour: u8) -> bool {
        let hour = hour % HOURS_PER_DAY as u8;
        let (start, end) = (self.config.night_start, self.config.night_end);
        if start <= end {
            hour >= start && hour <= end
        } else {
            // Window spans midnight
            hour >= start || hour <= end
        }
    }

    /// Power level for `aqi` under `conditions`, capped at 1.0
    ///
    /// Adjustments multiply the category's base level. The night factor may
    /// take the result below the table's minimum; only the ceiling is enforced.
    pub fn power_level(&self, aqi: f64, conditions: &Conditions) -> f64 {
        let category = self.category_of(aqi);
        let mut power = self.config.power_table.base_power(category);

        if conditions.humidity > HIGH_HUMIDITY {
            power *= HUMIDITY_FACTOR;
        }
        if conditions.temperature > HIGH_TEMPERATURE {
            power *= TEMPERATURE_FACTOR;
        }
        if conditions.traffic_density > HIGH_TRAFFIC {
            power *= TRAFFIC_FACTOR;
        }
        if self.is_night(conditions.hour) {
            power *= NIGHT_FACTOR;
        }

        let level = power.min(1.0);
        debug!(aqi = aqi, category = %category, power_level = level, "Computed power level");
        level
    }

    /// Cost of running at `power_level` for `duration_hours` at the configured rate
    pub fn energy_cost(&self, power_level: f64, duration_hours: f64) -> f64 {
        self.energy_cost_at_rate(power_level, duration_hours, self.config.rate_per_kwh)
    }

    pub fn energy_cost_at_rate(
        &self,
        power_level: f64,
        duration_hours: f64,
        rate_per_kwh: f64,
    ) -> f64 {
        self.config.max_draw_kw * power_level * duration_hours * rate_per_kwh
    }

    /// Plan power for each hour of the day
    ///
    /// Hours with good air outside every peak window get the off-peak discount.
    /// The pattern must hold exactly one AQI value per hour.
    pub fn optimize_schedule(
        &self,
        daily_aqi_pattern: &[f64],
        peak_windows: &[PeakWindow],
    ) -> Result<DailySchedule, InputShapeError> {
        if daily_aqi_pattern.len() != HOURS_PER_DAY {
            return Err(InputShapeError::ScheduleLength {
                expected: HOURS_PER_DAY,
                actual: daily_aqi_pattern.len(),
            });
        }

        let power_levels = daily_aqi_pattern
            .iter()
            .enumerate()
            .map(|(hour, &aqi)| {
                let mut power = self.config.power_table.base_power(self.category_of(aqi));
                let in_peak = peak_windows.iter().any(|w| w.contains(hour));
                if aqi <= GOOD_MAX && !in_peak {
                    power *= OFF_PEAK_FACTOR;
                }
                power.min(1.0)
            })
            .collect();

        Ok(DailySchedule {
            aqi: daily_aqi_pattern.to_vec(),
            power_levels,
        })
    }

    /// Energy report for a schedule using the configured draw and rate
    pub fn report(&self, schedule: &DailySchedule) -> ScheduleReport {
        schedule.report(self.config.max_draw_kw * 1000.0, self.config.rate_per_kwh)
    }
}

/// Category lookup with the standard thresholds
pub fn category_of(aqi: f64) -> AqiCategory {
    AqiCategory::from_aqi(aqi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm(hour: u8) -> Conditions {
        Conditions::new(50.0, 22.0, 0.2, hour)
    }

    #[test]
    fn test_good_air_no_adjustments() {
        let optimizer = PurifierOptimizer::new();
        assert_eq!(optimizer.power_level(30.0, &calm(12)), 0.3);
    }

    #[test]
    fn test_all_adjustments_at_night() {
        let optimizer = PurifierOptimizer::new();
        let conditions = Conditions::new(75.0, 32.0, 0.8, 2);
        let level = optimizer.power_level(120.0, &conditions);
        assert!((level - 0.7 * 1.2 * 1.1 * 1.15 * 0.8).abs() < 1e-12);
        assert!((level - 0.850).abs() < 1e-3);
    }

    #[test]
    fn test_ceiling_applies() {
        let optimizer = PurifierOptimizer::new();
        let conditions = Conditions::new(90.0, 35.0, 0.9, 12);
        assert_eq!(optimizer.power_level(180.0, &conditions), 1.0);
        assert_eq!(optimizer.power_level(450.0, &conditions), 1.0);
    }

    #[test]
    fn test_night_can_go_below_table_minimum() {
        let optimizer = PurifierOptimizer::new();
        let level = optimizer.power_level(10.0, &calm(23));
        assert!((level - 0.24).abs() < 1e-12);
    }

    #[test]
    fn test_night_window_edges() {
        let optimizer = PurifierOptimizer::new();
        for hour in [22, 23, 0, 3, 5] {
            assert!(optimizer.is_night(hour), "hour {} should be night", hour);
        }
        for hour in [6, 12, 21] {
            assert!(!optimizer.is_night(hour), "hour {} should be day", hour);
        }
    }

    #[test]
    fn test_hours_past_midnight_wrap() {
        let optimizer = PurifierOptimizer::new();
        assert!(optimizer.is_night(24));
        assert!(optimizer.is_night(29));
        assert!(!optimizer.is_night(30));
        assert!(!optimizer.is_night(36));
        assert_eq!(optimizer.power_level(30.0, &calm(36)), 0.3);
        assert_eq!(
            optimizer.power_level(30.0, &calm(255)),
            optimizer.power_level(30.0, &calm(255 % 24))
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let optimizer = PurifierOptimizer::new();
        let at_threshold = Conditions::new(HIGH_HUMIDITY, HIGH_TEMPERATURE, HIGH_TRAFFIC, 12);
        assert_eq!(optimizer.power_level(75.0, &at_threshold), 0.5);
    }

    #[test]
    fn test_energy_cost() {
        let optimizer = PurifierOptimizer::new();
        assert!((optimizer.energy_cost(1.0, 24.0) - 0.05 * 24.0 * 0.12).abs() < 1e-12);
        assert!((optimizer.energy_cost_at_rate(0.5, 10.0, 0.2) - 0.05).abs() < 1e-12);
        assert_eq!(optimizer.energy_cost(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_schedule_peak_windows() {
        let optimizer = PurifierOptimizer::new();
        let schedule = optimizer
            .optimize_schedule(&[40.0; 24], &PeakWindow::default_windows())
            .unwrap();

        assert_eq!(schedule.len(), 24);
        for (hour, level) in schedule.power_levels().iter().enumerate() {
            let peak = (7..=10).contains(&hour) || (16..=19).contains(&hour);
            let expected = if peak { 0.3 } else { 0.24 };
            assert!((level - expected).abs() < 1e-12, "hour {}: {}", hour, level);
        }
    }

    #[test]
    fn test_schedule_discount_only_for_good_air() {
        let optimizer = PurifierOptimizer::new();
        let mut pattern = [40.0; 24];
        pattern[3] = 50.0;
        pattern[4] = 75.0;
        pattern[5] = 250.0;
        let levels = optimizer
            .optimize_schedule(&pattern, &[])
            .unwrap()
            .into_power_levels();
        assert!((levels[3] - 0.24).abs() < 1e-12);
        assert_eq!(levels[4], 0.5);
        assert_eq!(levels[5], 1.0);
    }

    #[test]
    fn test_schedule_rejects_wrong_length() {
        let optimizer = PurifierOptimizer::new();
        assert_eq!(
            optimizer.optimize_schedule(&[40.0; 23], &[]).unwrap_err(),
            InputShapeError::ScheduleLength {
                expected: 24,
                actual: 23
            }
        );
        assert!(optimizer.optimize_schedule(&[40.0; 25], &[]).is_err());
        assert!(optimizer.optimize_schedule(&[], &[]).is_err());
    }

    #[test]
    fn test_conditions_from_features() {
        let features = FeatureVector::from_array([
            10.0, 20.0, 15.0, 10.0, 0.5, 20.0, 31.0, 72.0, 5.0, 0.9,
        ]);
        let conditions = Conditions::from_features(&features, 8);
        assert_eq!(conditions, Conditions::new(72.0, 31.0, 0.9, 8));
    }

    #[test]
    fn test_report_uses_configured_draw_and_rate() {
        let optimizer = PurifierOptimizer::new();
        let schedule = optimizer.optimize_schedule(&[300.0; 24], &[]).unwrap();
        let report = optimizer.report(&schedule);
        assert!((report.total_energy_wh - 24.0 * 50.0).abs() < 1e-9);
        assert!((report.total_cost - optimizer.energy_cost(1.0, 24.0)).abs() < 1e-12);
    }
}
