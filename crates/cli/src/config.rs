//! Controller configuration
//!
//! Values come from an optional TOML file layered under `PURIFIER_*`
//! environment variables (nested keys use `__`, e.g.
//! `PURIFIER_FOREST__N_ESTIMATORS=50`). Every field has a default.

use anyhow::{Context, Result};
use purifier_lib::{ForestConfig, OptimizerConfig, PeakWindow, SyntheticGenerator};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file consulted when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "purifier.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct PurifierConfig {
    /// Identifier attached to every decision log
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Directory holding the persisted model and scaler
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default)]
    pub forest: ForestConfig,

    /// Synthetic data used when no persisted model is usable
    #[serde(default)]
    pub bootstrap: SyntheticGenerator,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default = "PeakWindow::default_windows")]
    pub peak_windows: Vec<PeakWindow>,
}

fn default_device_id() -> String {
    "purifier-01".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for PurifierConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            model_dir: default_model_dir(),
            forest: ForestConfig::default(),
            bootstrap: SyntheticGenerator::default(),
            optimizer: OptimizerConfig::default(),
            peak_windows: PeakWindow::default_windows(),
        }
    }
}

impl PurifierConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        let config = config::Config::builder()
            .add_source(config::File::from(file).required(required))
            .add_source(
                config::Environment::with_prefix("PURIFIER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;

        let loaded: Self = config
            .try_deserialize()
            .context("Invalid purifier configuration")?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings that deserialize cleanly but can never match an hour
    pub fn validate(&self) -> Result<()> {
        for window in &self.peak_windows {
            window
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid peak window: {}", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PurifierConfig::default();
        assert_eq!(config.device_id, "purifier-01");
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.bootstrap.samples, 1000);
        assert_eq!(config.peak_windows, PeakWindow::default_windows());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
device_id = "living-room"
model_dir = "/var/lib/purifier"
peak_windows = [[6, 9]]

[forest]
n_estimators = 25
max_depth = 6

[bootstrap]
samples = 200

[optimizer]
rate_per_kwh = 0.3
"#
        )
        .unwrap();

        let config = PurifierConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.device_id, "living-room");
        assert_eq!(config.model_dir, PathBuf::from("/var/lib/purifier"));
        assert_eq!(config.peak_windows, vec![PeakWindow::new(6, 9)]);
        assert_eq!(config.forest.n_estimators, 25);
        assert_eq!(config.forest.max_depth, 6);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.bootstrap.samples, 200);
        assert_eq!(config.bootstrap.seed, 42);
        assert_eq!(config.optimizer.rate_per_kwh, 0.3);
        assert_eq!(config.optimizer.night_start, 22);
    }

    #[test]
    fn test_invalid_peak_windows_rejected() {
        for windows in ["[[22, 2]]", "[[30, 40]]"] {
            let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
            writeln!(file, "peak_windows = {}", windows).unwrap();
            let err = PurifierConfig::load(Some(file.path())).unwrap_err();
            assert!(err.to_string().contains("Invalid peak window"), "{}", err);
        }
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(PurifierConfig::load(Some(&missing)).is_err());
    }
}
