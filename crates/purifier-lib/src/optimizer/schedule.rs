//! Daily schedules, peak windows and schedule efficiency reports

use super::AqiCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hours in a daily schedule
pub const HOURS_PER_DAY: usize = 24;

/// Inclusive hour range flagged as high-traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u8, u8)", into = "(u8, u8)")]
pub struct PeakWindow {
    pub start: u8,
    pub end: u8,
}

impl PeakWindow {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Hours must lie in 0-23 and the window must not run backwards
    pub fn validate(&self) -> Result<(), String> {
        if self.start > 23 || self.end > 23 {
            return Err(format!(
                "hours must be within 0-23, got {}-{}",
                self.start, self.end
            ));
        }
        if self.start > self.end {
            return Err(format!(
                "window {}-{} ends before it starts",
                self.start, self.end
            ));
        }
        Ok(())
    }

    pub fn contains(&self, hour: usize) -> bool {
        (self.start as usize) <= hour && hour <= (self.end as usize)
    }

    /// Morning and evening rush hours
    pub fn default_windows() -> Vec<PeakWindow> {
        vec![PeakWindow::new(7, 10), PeakWindow::new(16, 19)]
    }
}

impl From<(u8, u8)> for PeakWindow {
    fn from((start, end): (u8, u8)) -> Self {
        Self { start, end }
    }
}

impl From<PeakWindow> for (u8, u8) {
    fn from(window: PeakWindow) -> Self {
        (window.start, window.end)
    }
}

impl fmt::Display for PeakWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for PeakWindow {
    type Err = String;

    /// Parse `"start-end"`, e.g. `"7-10"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected START-END, got {:?}", s))?;
        let start: u8 = start
            .trim()
            .parse()
            .map_err(|e| format!("invalid start hour {:?}: {}", start, e))?;
        let end: u8 = end
            .trim()
            .parse()
            .map_err(|e| format!("invalid end hour {:?}: {}", end, e))?;
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }
}

/// Power levels for each hour of the day, aligned with the AQI pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub(crate) aqi: Vec<f64>,
    pub(crate) power_levels: Vec<f64>,
}

impl DailySchedule {
    pub fn power_levels(&self) -> &[f64] {
        &self.power_levels
    }

    pub fn aqi_pattern(&self) -> &[f64] {
        &self.aqi
    }

    pub fn len(&self) -> usize {
        self.power_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power_levels.is_empty()
    }

    pub fn into_power_levels(self) -> Vec<f64> {
        self.power_levels
    }

    /// Energy and efficiency breakdown of the schedule
    ///
    /// Each hour draws `power × max_watts` for one hour; cost uses `rate_per_kwh`.
    pub fn report(&self, max_watts: f64, rate_per_kwh: f64) -> ScheduleReport {
        let hours: Vec<HourlyUsage> = self
            .aqi
            .iter()
            .zip(&self.power_levels)
            .enumerate()
            .map(|(hour, (&aqi, &power_level))| {
                let energy_wh = power_level * max_watts;
                HourlyUsage {
                    hour,
                    aqi,
                    category: AqiCategory::from_aqi(aqi),
                    power_level,
                    energy_wh,
                    cost: energy_wh * rate_per_kwh / 1000.0,
                    efficiency_ratio: efficiency_ratio(aqi, power_level),
                }
            })
            .collect();

        let total_energy_wh = hours.iter().map(|h| h.energy_wh).sum();
        let total_cost = hours.iter().map(|h| h.cost).sum();
        let ratios: Vec<(usize, f64)> = hours
            .iter()
            .filter_map(|h| h.efficiency_ratio.map(|r| (h.hour, r)))
            .collect();
        let mean_efficiency = if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().map(|(_, r)| r).sum::<f64>() / ratios.len() as f64)
        };
        let peak_efficiency_hour = ratios
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| *h);
        let lowest_efficiency_hour = ratios
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| *h);

        ScheduleReport {
            hours,
            total_energy_wh,
            total_cost,
            mean_efficiency,
            peak_efficiency_hour,
            lowest_efficiency_hour,
        }
    }
}

/// AQI handled per percentage point of power; undefined when the purifier is off
fn efficiency_ratio(aqi: f64, power_level: f64) -> Option<f64> {
    if power_level > 0.0 {
        Some(aqi / (power_level * 100.0))
    } else {
        None
    }
}

/// One hour of a schedule report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyUsage {
    pub hour: usize,
    pub aqi: f64,
    pub category: AqiCategory,
    pub power_level: f64,
    pub energy_wh: f64,
    pub cost: f64,
    pub efficiency_ratio: Option<f64>,
}

/// Energy, cost and efficiency summary of a daily schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub hours: Vec<HourlyUsage>,
    pub total_energy_wh: f64,
    pub total_cost: f64,
    pub mean_efficiency: Option<f64>,
    pub peak_efficiency_hour: Option<usize>,
    pub lowest_efficiency_hour: Option<usize>,
}
