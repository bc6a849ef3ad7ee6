//! # Energy-Neutral Power Manager
//!
//! Simulation environment for learning duty-cycle policies on a
//! solar-powered sensor node.
//!
//! - [`trace`]: yearly harvest traces and day classification
//! - [`simulation`]: cursor, reward and the power manager environment
//! - [`config`]: figment-based settings
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod error;
pub mod simulation;
pub mod telemetry;
pub mod trace;

pub use error::EnvError;
