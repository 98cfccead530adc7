//! AQI categories and the power table keyed by them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bounds (inclusive) of the first four categories
pub const GOOD_MAX: f64 = 50.0;
pub const MODERATE_MAX: f64 = 100.0;
pub const UNHEALTHY_MAX: f64 = 150.0;
pub const VERY_UNHEALTHY_MAX: f64 = 200.0;

/// Ordered partition of the AQI scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AqiCategory {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub const ALL: [AqiCategory; 5] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];

    /// Threshold lookup; anything that is not `<= 200` (including NaN) is hazardous
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= GOOD_MAX {
            AqiCategory::Good
        } else if aqi <= MODERATE_MAX {
            AqiCategory::Moderate
        } else if aqi <= UNHEALTHY_MAX {
            AqiCategory::Unhealthy
        } else if aqi <= VERY_UNHEALTHY_MAX {
            AqiCategory::VeryUnhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "GOOD",
            AqiCategory::Moderate => "MODERATE",
            AqiCategory::Unhealthy => "UNHEALTHY",
            AqiCategory::VeryUnhealthy => "VERY_UNHEALTHY",
            AqiCategory::Hazardous => "HAZARDOUS",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base power level for each category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTable {
    pub good: f64,
    pub moderate: f64,
    pub unhealthy: f64,
    pub very_unhealthy: f64,
    pub hazardous: f64,
}

impl Default for PowerTable {
    fn default() -> Self {
        Self {
            good: 0.3,
            moderate: 0.5,
            unhealthy: 0.7,
            very_unhealthy: 0.9,
            hazardous: 1.0,
        }
    }
}

impl PowerTable {
    pub fn base_power(&self, category: AqiCategory) -> f64 {
        match category {
            AqiCategory::Good => self.good,
            AqiCategory::Moderate => self.moderate,
            AqiCategory::Unhealthy => self.unhealthy,
            AqiCategory::VeryUnhealthy => self.very_unhealthy,
            AqiCategory::Hazardous => self.hazardous,
        }
    }
}
