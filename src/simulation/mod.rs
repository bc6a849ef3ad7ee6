//! # Power Manager Simulation
//!
//! Drives a simulated energy-harvesting node through a year of solar harvest.
//!
//! ## Components
//!
//! - **Cursor**: hour-by-hour traversal of a shared trace with day and year boundaries
//! - **Reward**: end-of-day energy-neutrality scoring
//! - **Observation**: normalized or bucketed state reported to the agent
//! - **Power manager**: the environment itself, applying actions to the battery
//!
//! ## Parallel training
//!
//! An [`EnergyTrace`](crate::trace::EnergyTrace) is immutable after load.
//! Workers share it through an `Arc` and each owns its own
//! [`PowerManagerEnv`]; nothing is locked.

pub mod cursor;
pub mod observation;
pub mod power_manager;
pub mod reward;
pub mod stats;

pub use cursor::{CursorMode, CursorStep, DayCursor};
pub use observation::{
    ContinuousState, DiscreteState, DiscretizationConfig, Observation, StateEncoding,
    OBSERVATION_LEN,
};
pub use power_manager::{DeviceConfig, EnvironmentConfig, PowerManagerEnv, StepResult};
pub use reward::{LegacyRewardConfig, NormalizedRewardConfig, RewardConfig, RewardModel};
pub use stats::EpisodeStats;
