//! # Day Type Classification
//!
//! Maps the total solar input of a day onto a coarse class from 0 (darkest)
//! to 5 (brightest). The class doubles as a perfect next-day forecast for the
//! power manager.
//!
//! Two unit conventions exist for the daily total, and each carries its own
//! breakpoints:
//!
//! - [`ClassificationBasis::Radiation`]: sum of the hourly global solar
//!   radiation readings (MJ/m²), breakpoints `3.5, 7, 12, 15, 17.5`
//! - [`ClassificationBasis::HarvestedEnergy`]: sum of the derived hourly
//!   harvest (mWh), breakpoints `2500, 5000, 8000, 10000, 12000`
//!
//! Radiation is the default. The breakpoints of one convention are never
//! applied to totals of the other.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

/// Coarse classification of a day's solar input (0..=5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayType(u8);

impl DayType {
    /// Number of distinct day types
    pub const COUNT: usize = 6;

    /// Highest day type
    pub const MAX: DayType = DayType(5);

    /// Create a day type
    ///
    /// # Panics
    /// Panics if `value` is above 5.
    pub fn new(value: u8) -> Self {
        assert!(
            (value as usize) < Self::COUNT,
            "day type {value} outside 0..={}",
            Self::COUNT - 1
        );
        Self(value)
    }

    /// Iterate over all day types in ascending order
    pub fn all() -> impl Iterator<Item = DayType> {
        (0..Self::COUNT as u8).map(DayType)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Day type scaled into `[0, 1]`
    pub fn normalized(self) -> f64 {
        f64::from(self.0) / f64::from(Self::MAX.0)
    }
}

impl TryFrom<u8> for DayType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < Self::COUNT {
            Ok(Self(value))
        } else {
            Err(format!("day type {value} outside 0..=5"))
        }
    }
}

impl From<DayType> for u8 {
    fn from(day_type: DayType) -> Self {
        day_type.0
    }
}

impl std::fmt::Display for DayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quantity whose daily total drives the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassificationBasis {
    /// Daily sum of radiation readings in MJ/m²
    #[default]
    Radiation,
    /// Daily sum of harvested energy in mWh
    HarvestedEnergy,
}

impl ClassificationBasis {
    /// Breakpoints matching this basis' unit convention
    pub fn default_thresholds(self) -> [f64; DayType::COUNT - 1] {
        match self {
            ClassificationBasis::Radiation => [3.5, 7.0, 12.0, 15.0, 17.5],
            ClassificationBasis::HarvestedEnergy => [2500.0, 5000.0, 8000.0, 10000.0, 12000.0],
        }
    }
}

/// Day classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_day_type_config"))]
#[serde(default)]
pub struct DayTypeConfig {
    /// Unit convention of the daily total
    pub basis: ClassificationBasis,
    /// Ascending class breakpoints; `None` uses the basis defaults
    pub thresholds: Option<[f64; DayType::COUNT - 1]>,
}

impl Default for DayTypeConfig {
    fn default() -> Self {
        Self {
            basis: ClassificationBasis::Radiation,
            thresholds: None,
        }
    }
}

impl DayTypeConfig {
    /// Harvested-energy basis with its default breakpoints
    ///
    /// The breakpoints are in mWh of a 0.0165 m² cell at 15% efficiency; see
    /// `TraceConfig::harvested_energy` for the matching panel.
    pub fn harvested_energy() -> Self {
        Self {
            basis: ClassificationBasis::HarvestedEnergy,
            thresholds: None,
        }
    }

    /// Effective breakpoints
    pub fn thresholds(&self) -> [f64; DayType::COUNT - 1] {
        self.thresholds
            .unwrap_or_else(|| self.basis.default_thresholds())
    }

    /// Classify a daily total
    ///
    /// A total equal to a breakpoint belongs to the upper class.
    pub fn classify(&self, daily_total: f64) -> DayType {
        let class = self
            .thresholds()
            .iter()
            .position(|threshold| daily_total < *threshold)
            .unwrap_or(DayType::COUNT - 1);
        DayType::new(class as u8)
    }
}

pub(crate) fn validate_day_type_config(config: &DayTypeConfig) -> Result<(), ValidationError> {
    let thresholds = config.thresholds();
    let finite = thresholds.iter().all(|t| t.is_finite());
    let ascending = thresholds.windows(2).all(|pair| pair[0] < pair[1]);
    if finite && ascending {
        Ok(())
    } else {
        let mut error = ValidationError::new("thresholds_not_ascending");
        error.message = Some("day type thresholds must be finite and strictly ascending".into());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(0.0, 0)]
    #[case(3.49, 0)]
    #[case(3.5, 1)]
    #[case(6.99, 1)]
    #[case(7.0, 2)]
    #[case(12.0, 3)]
    #[case(15.0, 4)]
    #[case(17.49, 4)]
    #[case(17.5, 5)]
    #[case(40.0, 5)]
    fn test_radiation_classification(#[case] total: f64, #[case] expected: u8) {
        let config = DayTypeConfig::default();
        assert_eq!(config.classify(total), DayType::new(expected));
    }

    #[rstest]
    #[case(2499.0, 0)]
    #[case(2500.0, 1)]
    #[case(5000.0, 2)]
    #[case(9999.0, 3)]
    #[case(10000.0, 4)]
    #[case(12000.0, 5)]
    fn test_harvested_energy_classification(#[case] total: f64, #[case] expected: u8) {
        let config = DayTypeConfig::harvested_energy();
        assert_eq!(config.classify(total), DayType::new(expected));
    }

    #[test]
    fn test_negative_total_is_darkest() {
        assert_eq!(DayTypeConfig::default().classify(-1.0), DayType::new(0));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_day_type_out_of_range_panics() {
        let _ = DayType::new(6);
    }

    #[test]
    fn test_day_type_normalization() {
        assert_eq!(DayType::new(0).normalized(), 0.0);
        assert_eq!(DayType::MAX.normalized(), 1.0);
        assert!((DayType::new(2).normalized() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_day_type_serde_rejects_out_of_range() {
        assert_eq!(serde_json::to_string(&DayType::new(4)).unwrap(), "4");
        assert_eq!(serde_json::from_str::<DayType>("2").unwrap(), DayType::new(2));
        assert!(serde_json::from_str::<DayType>("9").is_err());
    }

    #[test]
    fn test_basis_string_forms() {
        assert_eq!(ClassificationBasis::HarvestedEnergy.to_string(), "harvested_energy");
        assert_eq!(
            ClassificationBasis::from_str("radiation").unwrap(),
            ClassificationBasis::Radiation
        );
    }

    #[test]
    fn test_threshold_validation() {
        assert!(validate_day_type_config(&DayTypeConfig::default()).is_ok());

        let unordered = DayTypeConfig {
            basis: ClassificationBasis::Radiation,
            thresholds: Some([3.5, 7.0, 7.0, 15.0, 17.5]),
        };
        assert!(validate_day_type_config(&unordered).is_err());
        assert!(unordered.validate().is_err());
    }
}
