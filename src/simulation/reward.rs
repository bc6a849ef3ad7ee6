//! # End-of-Day Reward
//!
//! Scores how close the battery finished a day to its optimal level. The
//! input is the energy-neutrality deviation `BOPT - battery` in mWh.
//!
//! ## Normalized model
//!
//! ```text
//!            ⎧ exp(-(d/σ)²/2)             |d| ≤ band · R
//! reward  =  ⎨
//!            ⎩ -offset - slope · |d/R|    otherwise
//! ```
//!
//! with `σ = sigma · R`. The peak is exactly 1 at `d = 0`. At the band edge
//! the Gaussian has decayed to about 0.056 while the linear branch starts at
//! -0.55 for the default coefficients, so the reward drops there.
//!
//! ## Legacy model
//!
//! The earlier scoring used an unnormalized Gaussian density scaled by 1e6
//! inside a fixed ±2400 mWh band and a steep linear penalty outside it.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum::{Display, EnumString};
use validator::Validate;

/// Reward shape selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RewardModel {
    /// Unit-peak Gaussian band with a linear out-of-band penalty
    #[default]
    Normalized,
    /// Scaled Gaussian density with a fixed band
    Legacy,
}

/// Coefficients of the normalized reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NormalizedRewardConfig {
    /// Deviation scale `R` in mWh
    #[validate(range(min = 1e-9))]
    pub r_param: f64,
    /// Half-width of the Gaussian band as a fraction of `R`
    #[validate(range(min = 0.0))]
    pub band_fraction: f64,
    /// Standard deviation as a fraction of `R`
    #[validate(range(min = 1e-9))]
    pub sigma_fraction: f64,
    /// Constant part of the out-of-band penalty
    pub out_of_band_offset: f64,
    /// Slope of the out-of-band penalty per unit of `|d/R|`
    pub out_of_band_slope: f64,
}

impl Default for NormalizedRewardConfig {
    fn default() -> Self {
        Self {
            r_param: 20000.0,
            band_fraction: 0.12,
            sigma_fraction: 0.05,
            out_of_band_offset: 0.25,
            out_of_band_slope: 2.5,
        }
    }
}

/// Coefficients of the legacy reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LegacyRewardConfig {
    /// Gaussian standard deviation in mWh
    #[validate(range(min = 1e-9))]
    pub sigma_mwh: f64,
    /// Half-width of the Gaussian band in mWh
    #[validate(range(min = 0.0))]
    pub band_mwh: f64,
    /// Multiplier applied to the density
    pub scale: f64,
    pub out_of_band_offset: f64,
    /// Penalty per mWh of deviation outside the band
    pub out_of_band_slope: f64,
}

impl Default for LegacyRewardConfig {
    fn default() -> Self {
        Self {
            sigma_mwh: 1000.0,
            band_mwh: 2400.0, // 24 h at 100 mW
            scale: 1e6,
            out_of_band_offset: 100.0,
            out_of_band_slope: 0.05,
        }
    }
}

/// Reward settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RewardConfig {
    pub model: RewardModel,
    #[validate(nested)]
    pub normalized: NormalizedRewardConfig,
    #[validate(nested)]
    pub legacy: LegacyRewardConfig,
    /// Subtracted when training resets a battery pinned at a limit
    #[validate(range(min = 0.0))]
    pub limit_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            model: RewardModel::Normalized,
            normalized: NormalizedRewardConfig::default(),
            legacy: LegacyRewardConfig::default(),
            limit_penalty: 2.0,
        }
    }
}

impl RewardConfig {
    /// Reward for a day that ended with the given deviation in mWh
    pub fn evaluate(&self, deviation_mwh: f64) -> f64 {
        match self.model {
            RewardModel::Normalized => self.normalized.evaluate(deviation_mwh),
            RewardModel::Legacy => self.legacy.evaluate(deviation_mwh),
        }
    }
}

impl NormalizedRewardConfig {
    pub fn evaluate(&self, deviation_mwh: f64) -> f64 {
        if deviation_mwh.abs() <= self.band_fraction * self.r_param {
            let sigma = self.sigma_fraction * self.r_param;
            (-(deviation_mwh / sigma).powi(2) / 2.0).exp()
        } else {
            -self.out_of_band_offset - self.out_of_band_slope * (deviation_mwh / self.r_param).abs()
        }
    }
}

impl LegacyRewardConfig {
    pub fn evaluate(&self, deviation_mwh: f64) -> f64 {
        if deviation_mwh.abs() <= self.band_mwh {
            let density = (-(deviation_mwh / self.sigma_mwh).powi(2) / 2.0).exp()
                / ((2.0 * PI).sqrt() * self.sigma_mwh);
            density * self.scale
        } else {
            -self.out_of_band_offset - self.out_of_band_slope * deviation_mwh.abs()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_peak_is_one() {
        let reward = RewardConfig::default();
        assert_eq!(reward.evaluate(0.0), 1.0);
    }

    #[test]
    fn test_normalized_symmetric_and_decreasing_in_band() {
        let reward = NormalizedRewardConfig::default();
        let band = reward.band_fraction * reward.r_param;

        let mut previous = reward.evaluate(0.0);
        let mut d = 50.0;
        while d <= band {
            let value = reward.evaluate(d);
            assert!(value < previous, "not decreasing at {d}");
            assert!((value - reward.evaluate(-d)).abs() < 1e-12);
            previous = value;
            d += 50.0;
        }
    }

    #[test]
    fn test_normalized_one_sigma() {
        let reward = NormalizedRewardConfig::default();
        // σ = 1000 mWh
        assert!((reward.evaluate(1000.0) - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_out_of_band_linear() {
        let reward = NormalizedRewardConfig::default();
        assert!((reward.evaluate(4000.0) - (-0.25 - 2.5 * 0.2)).abs() < 1e-12);
        assert!((reward.evaluate(-10000.0) - (-0.25 - 2.5 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_band_edge_drop() {
        let reward = NormalizedRewardConfig::default();
        let edge = reward.band_fraction * reward.r_param;

        let inside = reward.evaluate(edge);
        let outside = reward.evaluate(edge + 1e-6);

        assert!((inside - (-2.88f64).exp()).abs() < 1e-12);
        assert!((outside - (-0.55)).abs() < 1e-6);
        // Every in-band value outranks every out-of-band value
        assert!(inside > 0.0 && outside < 0.0);
    }

    #[test]
    fn test_legacy_model() {
        let reward = RewardConfig {
            model: RewardModel::Legacy,
            ..Default::default()
        };

        let peak = 1e6 / ((2.0 * PI).sqrt() * 1000.0);
        assert!((reward.evaluate(0.0) - peak).abs() < 1e-9);
        assert!(reward.evaluate(2400.0) > 0.0);
        assert!((reward.evaluate(3000.0) - (-100.0 - 150.0)).abs() < 1e-9);
    }

    #[test]
    fn test_model_string_forms() {
        assert_eq!(RewardModel::Legacy.to_string(), "legacy");
        assert_eq!("normalized".parse::<RewardModel>().unwrap(), RewardModel::Normalized);
    }
}
