use anyhow::{ensure, Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::simulation::EnvironmentConfig;
use crate::trace::{CsvSourceConfig, TraceConfig};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub trace: TraceConfig,
    pub csv: CsvSourceConfig,
    #[validate(nested)]
    pub environment: EnvironmentConfig,
    pub run: RunConfig,
}

/// Trace selection and policy for the command-line rollout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub location: String,
    pub year: i32,
    /// Fixed duty-cycle level applied every hour
    pub action: f64,
    pub start_day: usize,
    /// Initial battery level in mWh (None = optimal level)
    pub initial_battery_mwh: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            location: "tokyo".to_string(),
            year: 2010,
            action: 4.0,
            start_day: 0,
            initial_battery_mwh: None,
        }
    }
}

impl RunConfig {
    /// Check the rollout settings against a loaded trace
    pub fn check_against(&self, num_days: usize) -> Result<()> {
        ensure!(
            self.start_day < num_days,
            "run.start_day {} is outside the {}-day trace for {}/{}",
            self.start_day,
            num_days,
            self.location,
            self.year
        );
        Ok(())
    }
}

impl Config {
    /// Load `config/default.toml` with `ENO__` environment overrides
    ///
    /// Nested keys are separated by a double underscore, e.g.
    /// `ENO__ENVIRONMENT__DEVICE__BATTERY_MAX_MWH=12000`.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("ENO__").split("__")),
        )
    }

    /// Load a specific TOML file without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_figment(Figment::new().merge(Toml::file(path)))
            .with_context(|| format!("loading {}", path.display()))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{RewardModel, StateEncoding};
    use crate::trace::ClassificationBasis;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_toml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/default.toml",
                r#"
                [trace]
                shuffle_days = true
                random_seed = 42

                [trace.panel]
                area_m2 = 0.0165
                efficiency = 0.15

                [trace.day_types]
                basis = "harvested_energy"

                [environment]
                train_mode = true
                day_type = 3

                [environment.device]
                battery_max_mwh = 8000.0

                [environment.reward]
                model = "legacy"

                [environment.encoding.discretized]
                battery_buckets = 8

                [run]
                location = "wakkanai"
                "#,
            )?;
            jail.set_env("ENO__ENVIRONMENT__DEVICE__NUM_ACTIONS", "5");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert!(config.trace.shuffle_days);
            assert_eq!(config.trace.random_seed, Some(42));
            assert_eq!(config.trace.day_types.basis, ClassificationBasis::HarvestedEnergy);
            assert!(config.environment.train_mode);
            assert_eq!(config.environment.day_type.map(|t| t.value()), Some(3));
            assert_eq!(config.environment.device.battery_max_mwh, 8000.0);
            assert_eq!(config.environment.device.num_actions, 5);
            assert_eq!(config.environment.reward.model, RewardModel::Legacy);
            assert_eq!(config.run.location, "wakkanai");
            assert_eq!(config.run.year, 2010);
            match &config.environment.encoding {
                StateEncoding::Discretized(buckets) => {
                    assert_eq!(buckets.battery_buckets, 8);
                    assert_eq!(buckets.deviation_buckets, 42);
                }
                other => panic!("unexpected encoding {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_invalid_limits_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bad.toml",
                r#"
                [environment.device]
                battery_min_mwh = 500.0
                battery_max_mwh = 100.0
                "#,
            )?;
            let err = Config::from_file("bad.toml").unwrap_err();
            assert!(format!("{err:#}").contains("invalid configuration"));
            Ok(())
        });
    }

    #[test]
    fn test_start_day_checked_against_trace() {
        let run = RunConfig {
            start_day: 365,
            ..Default::default()
        };
        let err = run.check_against(365).unwrap_err();
        assert!(err.to_string().contains("start_day 365"));
        assert!(run.check_against(366).is_ok());
    }

    #[test]
    fn test_out_of_range_day_type_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[environment]\nday_type = 9\n")?;
            assert!(Config::from_file("bad.toml").is_err());
            Ok(())
        });
    }
}
