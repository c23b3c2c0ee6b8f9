//! Layered runtime configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file
//! (`aq-dashboard.toml` in the working directory or an explicit `--config`
//! path), then `AQ_DASHBOARD__*` environment variables using `__` as the
//! nesting separator (`AQ_DASHBOARD__THRESHOLDS__PM25=25`). CLI flags are
//! applied on top by the command layer.
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::Result;
use crate::models::Pollutant;
use crate::utils::constants::*;

/// WHO reference values used for exceedance counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Thresholds {
    #[validate(range(min = 0.0))]
    pub pm25: f64,
    #[validate(range(min = 0.0))]
    pub pm10: f64,
    #[validate(range(min = 0.0))]
    pub so2: f64,
    #[validate(range(min = 0.0))]
    pub no2: f64,
    #[validate(range(min = 0.0))]
    pub co: f64,
    #[validate(range(min = 0.0))]
    pub o3: f64,
}

impl Thresholds {
    pub fn get(&self, pollutant: Pollutant) -> f64 {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::So2 => self.so2,
            Pollutant::No2 => self.no2,
            Pollutant::Co => self.co,
            Pollutant::O3 => self.o3,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pm25: WHO_PM25,
            pm10: WHO_PM10,
            so2: WHO_SO2,
            no2: WHO_NO2,
            co: WHO_CO,
            o3: WHO_O3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RfmConfig {
    #[validate(range(min = 1, max = 36500))]
    pub window_days: i64,
}

impl Default for RfmConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_RFM_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[validate(range(min = 200))]
    pub chart_width: u32,
    #[validate(range(min = 200))]
    pub chart_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chart_width: DEFAULT_CHART_WIDTH,
            chart_height: DEFAULT_CHART_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct DashboardConfig {
    #[validate(nested)]
    pub thresholds: Thresholds,
    #[validate(nested)]
    pub rfm: RfmConfig,
    #[validate(nested)]
    pub output: OutputConfig,
}

impl DashboardConfig {
    /// Resolve defaults, file and environment into a validated configuration.
    ///
    /// An explicit path must exist; the default file name is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&DashboardConfig::default())?;

        let file_source = match path {
            Some(p) => File::from(p).required(true),
            None => File::from(Path::new(CONFIG_FILE_NAME)).required(false),
        };

        let resolved: DashboardConfig = Config::builder()
            .add_source(defaults)
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        resolved.validate()?;
        Ok(resolved)
    }

    pub fn log_config(&self) {
        tracing::debug!("Configuration loaded:");
        for pollutant in Pollutant::ALL {
            tracing::debug!(
                "  threshold {:<6}: {} {}",
                pollutant.column_name(),
                self.thresholds.get(pollutant),
                pollutant.threshold_unit()
            );
        }
        tracing::debug!("  rfm window    : {} days", self.rfm.window_days);
        tracing::debug!("  output dir    : {}", self.output.dir.display());
        tracing::debug!(
            "  chart size    : {}x{}",
            self.output.chart_width,
            self.output.chart_height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_use_who_values() {
        let config = DashboardConfig::default();
        assert_eq!(config.thresholds.get(Pollutant::Pm25), 15.0);
        assert_eq!(config.thresholds.get(Pollutant::Pm10), 45.0);
        assert_eq!(config.thresholds.get(Pollutant::Co), 4.0);
        assert_eq!(config.rfm.window_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[thresholds]\npm25 = 25.0\n\n[rfm]\nwindow_days = 14")?;

        let config = DashboardConfig::load(Some(file.path()))?;
        assert_eq!(config.thresholds.pm25, 25.0);
        assert_eq!(config.thresholds.no2, 25.0);
        assert_eq!(config.rfm.window_days, 14);
        assert_eq!(config.output.dir, PathBuf::from("output"));
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[rfm]\nwindow_days = 0")?;

        assert!(DashboardConfig::load(Some(file.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_oversized_window_is_rejected() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[rfm]\nwindow_days = 1000000000")?;

        assert!(DashboardConfig::load(Some(file.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_environment_overrides_file() -> Result<()> {
        // Keys no other test reads, since the process environment is shared
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[thresholds]\no3 = 80.0\n\n[output]\nchart_height = 500")?;

        std::env::set_var("AQ_DASHBOARD__THRESHOLDS__O3", "120");
        std::env::set_var("AQ_DASHBOARD__OUTPUT__CHART_HEIGHT", "720");
        let result = DashboardConfig::load(Some(file.path()));
        std::env::remove_var("AQ_DASHBOARD__THRESHOLDS__O3");
        std::env::remove_var("AQ_DASHBOARD__OUTPUT__CHART_HEIGHT");

        let config = result?;
        assert_eq!(config.thresholds.o3, 120.0);
        assert_eq!(config.output.chart_height, 720);
        assert_eq!(config.thresholds.pm25, 15.0);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = DashboardConfig::load(Some(Path::new("/nonexistent/aq-dashboard.toml")));
        assert!(result.is_err());
    }
}
