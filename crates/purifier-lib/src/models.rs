//! Core data models shared by the estimator and the optimizer

use crate::error::InputShapeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of sensor features the estimator consumes
pub const FEATURE_COUNT: usize = 10;

/// Feature names in the fixed model order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "pm25",
    "pm10",
    "no2",
    "so2",
    "co",
    "o3",
    "temperature",
    "humidity",
    "wind_speed",
    "traffic_density",
];

/// Documented physical range (min, max) of each feature, in model order
pub const FEATURE_RANGES: [(f64, f64); FEATURE_COUNT] = [
    (0.0, 500.0), // pm25, µg/m³
    (0.0, 600.0), // pm10, µg/m³
    (0.0, 200.0), // no2, ppb
    (0.0, 100.0), // so2, ppb
    (0.0, 50.0),  // co, ppm
    (0.0, 200.0), // o3, ppb
    (0.0, 50.0),  // temperature, °C
    (0.0, 100.0), // humidity, %
    (0.0, 20.0),  // wind_speed, m/s
    (0.0, 1.0),   // traffic_density
];

/// Ordered feature array as fed to the scaler and the regressor
pub type FeatureArray = [f64; FEATURE_COUNT];

/// One set of sensor readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub o3: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub traffic_density: f64,
}

impl FeatureVector {
    pub fn from_array(values: FeatureArray) -> Self {
        Self {
            pm25: values[0],
            pm10: values[1],
            no2: values[2],
            so2: values[3],
            co: values[4],
            o3: values[5],
            temperature: values[6],
            humidity: values[7],
            wind_speed: values[8],
            traffic_density: values[9],
        }
    }

    /// Build from an ordered slice, rejecting anything but exactly ten values
    pub fn from_slice(values: &[f64]) -> Result<Self, InputShapeError> {
        let array =
            FeatureArray::try_from(values).map_err(|_| InputShapeError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: values.len(),
            })?;
        Ok(Self::from_array(array))
    }

    pub fn to_array(&self) -> FeatureArray {
        [
            self.pm25,
            self.pm10,
            self.no2,
            self.so2,
            self.co,
            self.o3,
            self.temperature,
            self.humidity,
            self.wind_speed,
            self.traffic_density,
        ]
    }
}

/// Feature input accepted at the estimator boundary
///
/// Every variant is normalized to a [`FeatureArray`] before it reaches the
/// scaler, so prediction code only ever sees the ordered form.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureInput {
    /// Values in [`FEATURE_NAMES`] order
    Ordered(Vec<f64>),
    /// Values keyed by feature name; order-independent, extra keys ignored
    Keyed(HashMap<String, f64>),
    Vector(FeatureVector),
}

impl FeatureInput {
    pub fn normalize(&self) -> Result<FeatureArray, InputShapeError> {
        match self {
            FeatureInput::Ordered(values) => {
                FeatureVector::from_slice(values).map(|v| v.to_array())
            }
            FeatureInput::Keyed(map) => {
                let mut out = [0.0; FEATURE_COUNT];
                for (slot, name) in out.iter_mut().zip(FEATURE_NAMES) {
                    *slot = *map.get(name).ok_or(InputShapeError::MissingField(name))?;
                }
                Ok(out)
            }
            FeatureInput::Vector(vector) => Ok(vector.to_array()),
        }
    }
}

impl From<FeatureArray> for FeatureInput {
    fn from(values: FeatureArray) -> Self {
        FeatureInput::Ordered(values.to_vec())
    }
}

impl From<Vec<f64>> for FeatureInput {
    fn from(values: Vec<f64>) -> Self {
        FeatureInput::Ordered(values)
    }
}

impl From<&[f64]> for FeatureInput {
    fn from(values: &[f64]) -> Self {
        FeatureInput::Ordered(values.to_vec())
    }
}

impl From<HashMap<String, f64>> for FeatureInput {
    fn from(map: HashMap<String, f64>) -> Self {
        FeatureInput::Keyed(map)
    }
}

impl From<FeatureVector> for FeatureInput {
    fn from(vector: FeatureVector) -> Self {
        FeatureInput::Vector(vector)
    }
}

impl From<&FeatureVector> for FeatureInput {
    fn from(vector: &FeatureVector) -> Self {
        FeatureInput::Vector(*vector)
    }
}

/// A labelled training example
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureArray,
    pub aqi: f64,
}

impl TrainingSample {
    pub fn new(features: impl Into<FeatureInput>, aqi: f64) -> Result<Self, InputShapeError> {
        Ok(Self {
            features: features.into().normalize()?,
            aqi,
        })
    }
}
