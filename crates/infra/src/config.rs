//! Configuration loading and representation.
//!
//! Defaults are overridden either by a JSON file or by `FARMLEDGER_*`
//! environment variables.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use farmledger_flocks::{GrowthParameters, KpiThresholds};
use farmledger_observability::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    pub growth: GrowthParameters,
    /// Trailing window used to learn feed consumption (days).
    pub consumption_window_days: u64,
    pub kpi: KpiThresholds,
    pub log_format: LogFormat,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            growth: GrowthParameters::default(),
            consumption_window_days: 365,
            kpi: KpiThresholds::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl FarmConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        override_with(&lookup, "FARMLEDGER_DEFAULT_DAILY_GROWTH", &mut config.growth.default_daily_growth)?;
        override_with(&lookup, "FARMLEDGER_TARGET_EXIT_WEIGHT", &mut config.growth.target_exit_weight)?;
        override_with(&lookup, "FARMLEDGER_GROWTH_HISTORY_DAYS", &mut config.growth.history_days)?;
        override_with(&lookup, "FARMLEDGER_CONSUMPTION_WINDOW_DAYS", &mut config.consumption_window_days)?;
        override_with(&lookup, "FARMLEDGER_EXIT_DATE_WARNING_DAYS", &mut config.kpi.exit_date_warning_days)?;
        override_with(&lookup, "FARMLEDGER_LOG_FORMAT", &mut config.log_format)?;

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file; missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let growth = self.growth.default_daily_growth;
        if !(growth.is_finite() && growth > 0.0) {
            return Err(ConfigError::Invalid {
                key: "default_daily_growth",
                value: growth.to_string(),
            });
        }
        let target = self.growth.target_exit_weight;
        if !(target.is_finite() && target > 0.0) {
            return Err(ConfigError::Invalid {
                key: "target_exit_weight",
                value: target.to_string(),
            });
        }
        Ok(())
    }
}

fn override_with<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw.clone() })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = FarmConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, FarmConfig::default());
        assert_eq!(config.growth.default_daily_growth, 0.850);
        assert_eq!(config.growth.target_exit_weight, 115.0);
        assert_eq!(config.consumption_window_days, 365);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = FarmConfig::from_lookup(lookup(&[
            ("FARMLEDGER_DEFAULT_DAILY_GROWTH", "0.9"),
            ("FARMLEDGER_CONSUMPTION_WINDOW_DAYS", " 180 "),
            ("FARMLEDGER_LOG_FORMAT", "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.growth.default_daily_growth, 0.9);
        assert_eq!(config.consumption_window_days, 180);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = FarmConfig::from_lookup(lookup(&[("FARMLEDGER_GROWTH_HISTORY_DAYS", "a year")])).unwrap_err();
        assert!(err.to_string().contains("FARMLEDGER_GROWTH_HISTORY_DAYS"));

        let err = FarmConfig::from_lookup(lookup(&[("FARMLEDGER_DEFAULT_DAILY_GROWTH", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config: FarmConfig =
            serde_json::from_str(r#"{"growth": {"target_exit_weight": 120.0}, "log_format": "pretty"}"#).unwrap();
        assert_eq!(config.growth.target_exit_weight, 120.0);
        assert_eq!(config.growth.default_daily_growth, 0.850);
        assert_eq!(config.kpi, KpiThresholds::default());
    }
}
