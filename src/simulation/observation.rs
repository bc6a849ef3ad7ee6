//! # Observations
//!
//! The power manager reports four quantities after every reset and step:
//! battery level, energy-neutrality deviation, current harvest and day type.
//! They are normalized to roughly unit range and, for table-based learners,
//! optionally quantized into buckets.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::trace::DayType;

/// Number of observation components
pub const OBSERVATION_LEN: usize = 4;

/// Bucket counts for the discretized encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DiscretizationConfig {
    #[validate(range(min = 1))]
    pub battery_buckets: usize,
    #[validate(range(min = 1))]
    pub deviation_buckets: usize,
    #[validate(range(min = 1))]
    pub harvest_buckets: usize,
}

impl Default for DiscretizationConfig {
    fn default() -> Self {
        Self {
            battery_buckets: 10,
            deviation_buckets: 42,
            harvest_buckets: 30,
        }
    }
}

impl DiscretizationConfig {
    /// Number of day-type buckets (day types are already discrete)
    pub fn day_type_buckets(&self) -> usize {
        DayType::COUNT
    }

    /// Size of each dimension of a state table
    pub fn shape(&self) -> [usize; OBSERVATION_LEN] {
        [
            self.battery_buckets,
            self.deviation_buckets,
            self.harvest_buckets,
            self.day_type_buckets(),
        ]
    }

    pub fn battery_bucket(&self, normalized_battery: f64) -> usize {
        floor_bucket(normalized_battery, self.battery_buckets)
    }

    /// The deviation is assumed symmetric: values beyond ±0.5 share the edge
    /// buckets.
    pub fn deviation_bucket(&self, normalized_deviation: f64) -> usize {
        let shifted = normalized_deviation.clamp(-0.5, 0.5) + 0.5;
        let bucket = (shifted * self.deviation_buckets as f64).ceil();
        clamp_bucket(bucket, self.deviation_buckets)
    }

    pub fn harvest_bucket(&self, normalized_harvest: f64) -> usize {
        floor_bucket(normalized_harvest, self.harvest_buckets)
    }

    pub fn discretize(&self, state: &ContinuousState, day_type: DayType) -> DiscreteState {
        DiscreteState {
            battery: self.battery_bucket(state.battery),
            deviation: self.deviation_bucket(state.deviation),
            harvest: self.harvest_bucket(state.harvest),
            day_type,
        }
    }
}

fn floor_bucket(value: f64, buckets: usize) -> usize {
    clamp_bucket((value * buckets as f64).floor(), buckets)
}

fn clamp_bucket(bucket: f64, buckets: usize) -> usize {
    // NaN casts to 0; a zero bucket count collapses to bucket 0
    bucket.clamp(0.0, buckets.saturating_sub(1) as f64) as usize
}

/// How the environment reports its state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateEncoding {
    /// Normalized real values
    #[default]
    Continuous,
    /// Bucket indices for table-based learning
    Discretized(DiscretizationConfig),
}

/// Normalized state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContinuousState {
    /// battery / BMAX
    pub battery: f64,
    /// (BOPT - battery) / (BMAX / 2)
    pub deviation: f64,
    /// harvest / HMAX
    pub harvest: f64,
    /// day type / 5
    pub day_type: f64,
}

/// Quantized state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteState {
    pub battery: usize,
    pub deviation: usize,
    pub harvest: usize,
    /// Day type carried through as its own class
    pub day_type: DayType,
}

impl DiscreteState {
    pub fn as_indices(&self) -> [usize; OBSERVATION_LEN] {
        [self.battery, self.deviation, self.harvest, self.day_type.index()]
    }
}

/// State reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum Observation {
    Continuous(ContinuousState),
    Discrete(DiscreteState),
}

impl Observation {
    /// Four-component numeric view
    pub fn to_vec(&self) -> [f64; OBSERVATION_LEN] {
        match self {
            Observation::Continuous(s) => [s.battery, s.deviation, s.harvest, s.day_type],
            Observation::Discrete(s) => s.as_indices().map(|i| i as f64),
        }
    }

    pub fn as_continuous(&self) -> Option<&ContinuousState> {
        match self {
            Observation::Continuous(state) => Some(state),
            Observation::Discrete(_) => None,
        }
    }

    pub fn as_discrete(&self) -> Option<&DiscreteState> {
        match self {
            Observation::Discrete(state) => Some(state),
            Observation::Continuous(_) => None,
        }
    }
}
