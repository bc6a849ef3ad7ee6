//! # Power Manager Environment
//!
//! Reinforcement-learning environment for an energy-harvesting sensor node.
//! Every step the agent picks a duty-cycle level; the node consumes power in
//! proportion to it while the solar cell refills the battery with the hourly
//! harvest from an [`EnergyTrace`].
//!
//! ## Episode structure
//!
//! - One step is one hour
//! - Reward is only paid when a day ends and scores how close the battery
//!   finished to its optimal level (energy neutrality)
//! - An episode terminates when the cursor reports the end of the year
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use eno_power_manager::simulation::{EnvironmentConfig, PowerManagerEnv};
//! use eno_power_manager::trace::{EnergyTrace, InMemorySource, TraceConfig};
//!
//! let source = InMemorySource::new().with_readings("lab", 2010, &[0.5; 48]);
//! let trace = Arc::new(EnergyTrace::load(&source, "lab", 2010, &TraceConfig::default()).unwrap());
//!
//! let mut env = PowerManagerEnv::new(trace, EnvironmentConfig::default()).unwrap();
//! env.reset(0, None);
//! loop {
//!     let result = env.step(4);
//!     if result.year_ended {
//!         break;
//!     }
//! }
//! assert_eq!(env.stats().days_completed, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use validator::{Validate, ValidationError};

use super::cursor::{CursorMode, DayCursor};
use super::observation::{ContinuousState, Observation, StateEncoding};
use super::reward::RewardConfig;
use super::stats::EpisodeStats;
use crate::error::EnvError;
use crate::trace::{DayType, EnergyTrace};

/// Battery, harvest and load limits of the sensor node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_device_limits"))]
#[serde(default)]
pub struct DeviceConfig {
    /// Lower battery limit (BMIN) in mWh
    pub battery_min_mwh: f64,
    /// Upper battery limit (BMAX) in mWh
    #[validate(range(exclusive_min = 0.0))]
    pub battery_max_mwh: f64,
    /// Optimal battery level as a fraction of BMAX
    #[validate(range(min = 0.0, max = 1.0))]
    pub battery_optimal_fraction: f64,
    /// Lower harvest limit (HMIN) in mW
    pub harvest_min_mw: f64,
    /// Upper harvest limit (HMAX) in mW
    #[validate(range(exclusive_min = 0.0))]
    pub harvest_max_mw: f64,
    /// Consumption at the highest duty cycle (DMAX) in mW
    #[validate(range(exclusive_min = 0.0))]
    pub consumption_max_mw: f64,
    /// Number of duty-cycle levels
    #[validate(range(min = 1))]
    pub num_actions: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            battery_min_mwh: 0.0,
            battery_max_mwh: 9250.0,
            battery_optimal_fraction: 0.5,
            harvest_min_mw: 0.0,
            harvest_max_mw: 500.0,
            consumption_max_mw: 500.0,
            num_actions: 10,
        }
    }
}

impl DeviceConfig {
    /// Optimal battery level (BOPT) in mWh
    pub fn battery_optimal_mwh(&self) -> f64 {
        self.battery_optimal_fraction * self.battery_max_mwh
    }

    /// Consumption per duty-cycle level (DMIN) in mW
    pub fn consumption_min_mw(&self) -> f64 {
        self.consumption_max_mw / self.num_actions as f64
    }

    /// Highest valid action
    pub fn max_action(&self) -> f64 {
        (self.num_actions - 1) as f64
    }

    /// Clamp an action into `[0, N-1]`; non-finite actions select level 0
    pub fn clamp_action(&self, action: f64) -> f64 {
        if action.is_finite() {
            action.clamp(0.0, self.max_action())
        } else {
            0.0
        }
    }

    /// Power drawn at a clamped duty-cycle level
    pub fn consumption_mw(&self, action: f64) -> f64 {
        (action + 1.0) * self.consumption_min_mw()
    }

    pub fn clamp_battery(&self, battery_mwh: f64) -> f64 {
        battery_mwh.clamp(self.battery_min_mwh, self.battery_max_mwh)
    }

    pub fn clamp_harvest(&self, harvest_mw: f64) -> f64 {
        harvest_mw.clamp(self.harvest_min_mw, self.harvest_max_mw)
    }
}

pub(crate) fn validate_device_limits(config: &DeviceConfig) -> Result<(), ValidationError> {
    let finite = [
        config.battery_min_mwh,
        config.battery_max_mwh,
        config.harvest_min_mw,
        config.harvest_max_mw,
    ]
    .iter()
    .all(|v| v.is_finite());
    if !finite {
        return Err(limit_error("limits_not_finite", "device limits must be finite"));
    }
    if config.battery_min_mwh >= config.battery_max_mwh {
        return Err(limit_error("battery_limits", "battery minimum must be below maximum"));
    }
    if config.battery_optimal_mwh() < config.battery_min_mwh {
        return Err(limit_error("battery_optimal", "optimal battery level is below the minimum"));
    }
    if config.harvest_min_mw > config.harvest_max_mw {
        return Err(limit_error("harvest_limits", "harvest minimum exceeds maximum"));
    }
    Ok(())
}

fn limit_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Environment configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_encoding"))]
#[serde(default)]
pub struct EnvironmentConfig {
    #[validate(nested)]
    pub device: DeviceConfig,
    #[validate(nested)]
    pub reward: RewardConfig,
    pub encoding: StateEncoding,
    /// Restrict traversal to days of one type (None = every day in order)
    pub day_type: Option<DayType>,
    /// Reset a battery pinned at a limit at day end, with a penalty
    pub train_mode: bool,
}

pub(crate) fn validate_encoding(config: &EnvironmentConfig) -> Result<(), ValidationError> {
    match &config.encoding {
        StateEncoding::Continuous => Ok(()),
        StateEncoding::Discretized(buckets) => buckets
            .validate()
            .map_err(|_| limit_error("bucket_counts", "every bucket count must be at least 1")),
    }
}

/// Result of a reset or step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    /// End-of-day reward; 0 on every other step
    pub reward: f64,
    pub day_ended: bool,
    /// Episode is over
    pub year_ended: bool,
}

/// Duty-cycle control environment over one year of harvest
#[derive(Debug, Clone)]
pub struct PowerManagerEnv {
    config: EnvironmentConfig,
    cursor: DayCursor,
    battery_mwh: f64,
    deviation_mwh: f64,
    harvest_mw: f64,
    day_type: DayType,
    stats: EpisodeStats,
}

impl PowerManagerEnv {
    /// Create an environment positioned as after `reset(0, None)`
    pub fn new(trace: Arc<EnergyTrace>, config: EnvironmentConfig) -> Result<Self, EnvError> {
        config.validate()?;
        let cursor = DayCursor::new(trace, CursorMode::from(config.day_type))?;
        let current = cursor.current();

        let battery_mwh = config.device.battery_optimal_mwh();
        let mut env = Self {
            harvest_mw: config.device.clamp_harvest(current.harvest_mw),
            day_type: current.day_type,
            battery_mwh,
            deviation_mwh: 0.0,
            cursor,
            config,
            stats: EpisodeStats::default(),
        };
        env.reset(0, None);
        Ok(env)
    }

    /// Start a new episode
    ///
    /// Without an initial battery level the battery starts at BOPT. A given
    /// level is clamped into the battery limits. `start_day` only applies to
    /// unrestricted traversal.
    ///
    /// # Panics
    /// Panics if `start_day` is outside the trace in unrestricted mode.
    pub fn reset(&mut self, start_day: usize, initial_battery_mwh: Option<f64>) -> StepResult {
        let step = self.cursor.reset(start_day);
        let device = &self.config.device;

        self.battery_mwh = match initial_battery_mwh {
            Some(level) if level.is_finite() => device.clamp_battery(level),
            _ => device.battery_optimal_mwh(),
        };
        self.deviation_mwh = device.battery_optimal_mwh() - self.battery_mwh;
        self.harvest_mw = device.clamp_harvest(step.harvest_mw);
        self.day_type = step.day_type;
        self.stats = EpisodeStats::default();

        StepResult {
            observation: self.state(),
            reward: 0.0,
            day_ended: step.day_ended,
            year_ended: step.year_ended,
        }
    }

    /// Current observation without advancing
    pub fn state(&self) -> Observation {
        let device = &self.config.device;
        let continuous = ContinuousState {
            battery: self.battery_mwh / device.battery_max_mwh,
            deviation: self.deviation_mwh / (device.battery_max_mwh / 2.0),
            harvest: self.harvest_mw / device.harvest_max_mw,
            day_type: self.day_type.normalized(),
        };

        match &self.config.encoding {
            StateEncoding::Continuous => Observation::Continuous(continuous),
            StateEncoding::Discretized(buckets) => {
                Observation::Discrete(buckets.discretize(&continuous, self.day_type))
            }
        }
    }

    /// Run the node for one hour at the given duty-cycle level
    pub fn step(&mut self, action: impl Into<f64>) -> StepResult {
        let device = &self.config.device;
        let level = device.clamp_action(action.into());
        let consumption_mw = device.consumption_mw(level);

        self.battery_mwh = device.clamp_battery(self.battery_mwh + self.harvest_mw - consumption_mw);
        self.deviation_mwh = device.battery_optimal_mwh() - self.battery_mwh;
        self.stats.record_step(
            self.battery_mwh == device.battery_min_mwh,
            self.battery_mwh == device.battery_max_mwh,
        );

        let next = self.cursor.advance();
        self.harvest_mw = device.clamp_harvest(next.harvest_mw);
        self.day_type = next.day_type;

        let mut reward = 0.0;
        if next.day_ended {
            reward = self.config.reward.evaluate(self.deviation_mwh);

            let pinned = self.battery_mwh == device.battery_min_mwh
                || self.battery_mwh == device.battery_max_mwh;
            let continuous = matches!(self.config.encoding, StateEncoding::Continuous);
            if self.config.train_mode && continuous && pinned {
                debug!(battery_mwh = self.battery_mwh, "battery pinned at limit, resetting to optimum");
                self.battery_mwh = device.battery_optimal_mwh();
                self.deviation_mwh = 0.0;
                reward -= self.config.reward.limit_penalty;
                self.stats.limit_resets += 1;
            }

            self.stats.record_day(reward);
            debug!(
                day = self.stats.days_completed,
                reward,
                battery_mwh = self.battery_mwh,
                "day complete"
            );
        }

        if next.year_ended {
            info!(
                location = self.cursor.trace().location(),
                year = self.cursor.trace().year(),
                steps = self.stats.steps,
                days = self.stats.days_completed,
                cumulative_reward = self.stats.cumulative_reward,
                limit_hits = self.stats.limit_hits(),
                "episode complete"
            );
        }

        StepResult {
            observation: self.state(),
            reward,
            day_ended: next.day_ended,
            year_ended: next.year_ended,
        }
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn cursor(&self) -> &DayCursor {
        &self.cursor
    }

    /// Battery level in mWh
    pub fn battery_mwh(&self) -> f64 {
        self.battery_mwh
    }

    /// BOPT minus battery level, in mWh
    pub fn deviation_mwh(&self) -> f64 {
        self.deviation_mwh
    }

    /// Clamped harvest of the current hour in mW
    pub fn harvest_mw(&self) -> f64 {
        self.harvest_mw
    }

    pub fn day_type(&self) -> DayType {
        self.day_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::DiscretizationConfig;
    use crate::trace::{DayRow, TraceConfig, HOURS_PER_DAY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat_trace(levels: &[f64]) -> Arc<EnergyTrace> {
        let days: Vec<DayRow> = levels.iter().map(|level| [*level; HOURS_PER_DAY]).collect();
        let mut rng = StdRng::seed_from_u64(7);
        Arc::new(EnergyTrace::from_harvest("lab", 2010, days, &TraceConfig::default(), &mut rng).unwrap())
    }

    fn env_with(levels: &[f64], config: EnvironmentConfig) -> PowerManagerEnv {
        PowerManagerEnv::new(flat_trace(levels), config).unwrap()
    }

    #[test]
    fn test_device_defaults() {
        let device = DeviceConfig::default();
        assert_eq!(device.battery_optimal_mwh(), 4625.0);
        assert_eq!(device.consumption_min_mw(), 50.0);
        assert_eq!(device.consumption_mw(9.0), 500.0);
        assert!(device.validate().is_ok());
    }

    #[test]
    fn test_action_clamping() {
        let device = DeviceConfig::default();
        assert_eq!(device.clamp_action(-3.0), 0.0);
        assert_eq!(device.clamp_action(42.0), 9.0);
        assert_eq!(device.clamp_action(f64::NAN), 0.0);
        assert_eq!(device.clamp_action(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let config = EnvironmentConfig {
            device: DeviceConfig {
                battery_min_mwh: 100.0,
                battery_max_mwh: 50.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = PowerManagerEnv::new(flat_trace(&[0.0]), config).unwrap_err();
        assert!(matches!(err, EnvError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_buckets_rejected() {
        let config = EnvironmentConfig {
            encoding: StateEncoding::Discretized(DiscretizationConfig {
                harvest_buckets: 0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reset_observation() {
        let mut env = env_with(&[250.0, 100.0], EnvironmentConfig::default());
        let result = env.reset(0, None);

        let state = result.observation.as_continuous().copied().unwrap();
        assert_eq!(state.battery, 0.5);
        assert_eq!(state.deviation, 0.0);
        assert_eq!(state.harvest, 0.5);
        assert_eq!(result.reward, 0.0);
        assert!(!result.day_ended && !result.year_ended);
    }

    #[test]
    fn test_initial_battery_clamped() {
        let mut env = env_with(&[0.0], EnvironmentConfig::default());

        env.reset(0, Some(20000.0));
        assert_eq!(env.battery_mwh(), 9250.0);
        assert_eq!(env.deviation_mwh(), -4625.0);

        env.reset(0, Some(-5.0));
        assert_eq!(env.battery_mwh(), 0.0);

        env.reset(0, Some(f64::NAN));
        assert_eq!(env.battery_mwh(), 4625.0);
    }

    #[test]
    fn test_step_energy_balance() {
        // 250 mW in, action 1 draws 100 mW
        let mut env = env_with(&[250.0], EnvironmentConfig::default());
        env.reset(0, Some(1000.0));

        let result = env.step(1);
        assert_eq!(env.battery_mwh(), 1150.0);
        assert_eq!(env.deviation_mwh(), 3475.0);
        assert_eq!(result.reward, 0.0);
        assert!(!result.day_ended);
    }

    #[test]
    fn test_reward_only_at_day_end() {
        // Harvest matches action 4 consumption, so the battery holds BOPT
        let mut env = env_with(&[250.0, 250.0], EnvironmentConfig::default());
        env.reset(0, None);

        for _ in 0..HOURS_PER_DAY - 1 {
            let result = env.step(4);
            assert_eq!(result.reward, 0.0);
        }
        let result = env.step(4);
        assert!(result.day_ended);
        assert!(!result.year_ended);
        assert_eq!(result.reward, 1.0);
        assert_eq!(env.stats().days_completed, 1);
    }

    #[test]
    fn test_training_reset_at_limit() {
        let config = EnvironmentConfig {
            train_mode: true,
            ..Default::default()
        };
        let mut env = env_with(&[0.0, 0.0], config);
        env.reset(0, Some(0.0));

        let mut last = env.step(9);
        for _ in 1..HOURS_PER_DAY {
            last = env.step(9);
        }
        assert!(last.day_ended);

        // Deviation 4625 is outside the band: -0.25 - 2.5 * 0.23125
        let expected = -0.25 - 2.5 * (4625.0 / 20000.0) - 2.0;
        assert!((last.reward - expected).abs() < 1e-9);
        assert_eq!(env.battery_mwh(), 4625.0);
        assert_eq!(env.deviation_mwh(), 0.0);
        assert_eq!(env.stats().limit_resets, 1);
    }

    #[test]
    fn test_training_reset_skipped_for_discrete_encoding() {
        let config = EnvironmentConfig {
            train_mode: true,
            encoding: StateEncoding::Discretized(DiscretizationConfig::default()),
            ..Default::default()
        };
        let mut env = env_with(&[0.0, 0.0], config);
        env.reset(0, Some(0.0));

        for _ in 0..HOURS_PER_DAY {
            env.step(9);
        }
        assert_eq!(env.battery_mwh(), 0.0);
        assert_eq!(env.stats().limit_resets, 0);
    }

    #[test]
    fn test_discrete_observation() {
        let config = EnvironmentConfig {
            encoding: StateEncoding::Discretized(DiscretizationConfig::default()),
            ..Default::default()
        };
        let mut env = env_with(&[250.0], config);
        let result = env.reset(0, None);

        let state = result.observation.as_discrete().copied().unwrap();
        assert_eq!(state.battery, 5);
        assert_eq!(state.deviation, 21);
        assert_eq!(state.harvest, 15);
        assert_eq!(state.day_type, env.day_type());
    }

    #[test]
    fn test_non_finite_harvest_keeps_battery_finite() {
        let mut day = [10.0; HOURS_PER_DAY];
        day[0] = f64::NAN;
        let mut rng = StdRng::seed_from_u64(7);
        let trace =
            EnergyTrace::from_harvest("lab", 2010, vec![day], &TraceConfig::default(), &mut rng).unwrap();
        let mut env = PowerManagerEnv::new(Arc::new(trace), EnvironmentConfig::default()).unwrap();

        env.reset(0, None);
        assert_eq!(env.harvest_mw(), 0.0);
        env.step(0);
        assert_eq!(env.battery_mwh(), 4625.0 - 50.0);
        assert_eq!(env.harvest_mw(), 10.0);
    }

    #[test]
    fn test_stats_cleared_on_reset() {
        let mut env = env_with(&[0.0], EnvironmentConfig::default());
        env.reset(0, Some(0.0));
        env.step(0);
        assert_eq!(env.stats().battery_empty_steps, 1);

        env.reset(0, None);
        assert_eq!(env.stats(), &EpisodeStats::default());
    }
}
