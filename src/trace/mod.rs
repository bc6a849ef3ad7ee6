//! # Harvested Energy Traces
//!
//! A trace is one year of hourly solar input for a location, converted into
//! the power a small sensor-node panel would harvest, with every day
//! classified into a [`DayType`].
//!
//! ## Conversion
//!
//! Readings are global solar radiation in MJ/m² per hour. The harvest in mW is
//!
//! ```text
//! power_mw = radiation × 1e6 × area_m2 × efficiency × 1000 / 3600
//! ```
//!
//! Missing readings count as zero so that day boundaries stay aligned.
//!
//! ## Usage
//!
//! ```rust
//! use eno_power_manager::trace::{EnergyTrace, InMemorySource, TraceConfig};
//!
//! let readings = vec![0.5; 24 * 3];
//! let source = InMemorySource::new().with_readings("tokyo", 2010, &readings);
//!
//! let config = TraceConfig { random_seed: Some(7), ..Default::default() };
//! let trace = EnergyTrace::load(&source, "tokyo", 2010, &config).unwrap();
//!
//! assert_eq!(trace.num_days(), 3);
//! assert_eq!(trace.hours_per_day(), 24);
//! ```
//!
//! The trace is immutable once loaded. Share it between environments with an
//! `Arc`; all randomization happens inside the load call with a caller-chosen
//! seed.

pub mod day_type;
pub mod source;

pub use day_type::{ClassificationBasis, DayType, DayTypeConfig};
pub use source::{CsvRadiationSource, CsvSourceConfig, InMemorySource, RadiationSource};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::error::EnvError;

/// Hours in one trace row
pub const HOURS_PER_DAY: usize = 24;

/// One day of hourly values
pub type DayRow = [f64; HOURS_PER_DAY];

/// Solar cell used to convert radiation into harvested power
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PanelConfig {
    /// Active cell area in m²
    #[validate(range(min = 0.0))]
    pub area_m2: f64,
    /// Conversion efficiency (0.0-1.0)
    #[validate(range(min = 0.0, max = 1.0))]
    pub efficiency: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            area_m2: 55e-3 * 70e-3, // 55 mm x 70 mm cell
            efficiency: 0.15,
        }
    }
}

impl PanelConfig {
    /// mW harvested per MJ/m² of hourly radiation
    pub fn conversion_factor(&self) -> f64 {
        1e6 * self.area_m2 * self.efficiency * 1000.0 / 3600.0
    }

    /// Harvested power in mW for one hourly radiation reading
    pub fn harvest_mw(&self, radiation_mj_m2: f64) -> f64 {
        radiation_mj_m2 * self.conversion_factor()
    }

    /// 0.0165 m² cell at 15%, the panel the default harvested-energy
    /// breakpoints are expressed for
    pub fn calibration_cell() -> Self {
        Self {
            area_m2: 0.0165,
            efficiency: 0.15,
        }
    }

    fn same_conversion(&self, other: &PanelConfig) -> bool {
        let (a, b) = (self.conversion_factor(), other.conversion_factor());
        (a - b).abs() <= 1e-9 * b.abs()
    }
}

/// Trace loading settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_basis_panel"))]
#[serde(default)]
pub struct TraceConfig {
    #[validate(nested)]
    pub panel: PanelConfig,
    #[validate(nested)]
    pub day_types: DayTypeConfig,
    /// Permute the day order before classification
    pub shuffle_days: bool,
    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl TraceConfig {
    /// Classify by harvested energy with the panel its default breakpoints
    /// are calibrated for
    pub fn harvested_energy() -> Self {
        Self {
            panel: PanelConfig::calibration_cell(),
            day_types: DayTypeConfig::harvested_energy(),
            ..Default::default()
        }
    }
}

/// Default harvested-energy breakpoints only hold for the calibration cell;
/// any other panel needs explicit thresholds.
pub(crate) fn validate_basis_panel(config: &TraceConfig) -> Result<(), ValidationError> {
    let default_energy_thresholds = config.day_types.basis == ClassificationBasis::HarvestedEnergy
        && config.day_types.thresholds.is_none();
    if default_energy_thresholds && !config.panel.same_conversion(&PanelConfig::calibration_cell()) {
        let mut error = ValidationError::new("uncalibrated_panel");
        error.message = Some(
            "default harvested-energy thresholds assume a 0.0165 m² cell at 15%; \
             configure that panel or explicit thresholds"
                .into(),
        );
        return Err(error);
    }
    Ok(())
}

/// Per-year overview of a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub location: String,
    pub year: i32,
    pub num_days: usize,
    /// Number of days per day type, indexed by type
    pub days_per_type: [usize; DayType::COUNT],
    /// Total harvest over the year in mWh
    pub total_energy_mwh: f64,
    /// Mean daily harvest in mWh
    pub mean_daily_energy_mwh: f64,
}

/// One year of hourly harvest with per-day classification
#[derive(Debug, Clone)]
pub struct EnergyTrace {
    location: String,
    year: i32,
    radiation: Vec<DayRow>,
    energy: Vec<DayRow>,
    day_types: Vec<DayType>,
    days_by_type: [Vec<usize>; DayType::COUNT],
}

impl EnergyTrace {
    /// Load a trace, seeding randomization from `config.random_seed`
    pub fn load<S>(source: &S, location: &str, year: i32, config: &TraceConfig) -> Result<Self, EnvError>
    where
        S: RadiationSource + ?Sized,
    {
        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::load_with_rng(source, location, year, config, &mut rng)
    }

    /// Load a trace using the caller's random number generator
    pub fn load_with_rng<S, R>(
        source: &S,
        location: &str,
        year: i32,
        config: &TraceConfig,
        rng: &mut R,
    ) -> Result<Self, EnvError>
    where
        S: RadiationSource + ?Sized,
        R: Rng + ?Sized,
    {
        let readings = source.readings(location, year)?;
        Self::from_readings(location, year, &readings, config, rng)
    }

    /// Build a trace from a flat sequence of hourly radiation readings
    ///
    /// `None` and non-finite readings are treated as zero.
    pub fn from_readings<R>(
        location: &str,
        year: i32,
        readings: &[Option<f64>],
        config: &TraceConfig,
        rng: &mut R,
    ) -> Result<Self, EnvError>
    where
        R: Rng + ?Sized,
    {
        if readings.is_empty() {
            return Err(EnvError::unavailable(location, year, "no readings"));
        }
        if readings.len() % HOURS_PER_DAY != 0 {
            return Err(EnvError::unavailable(
                location,
                year,
                format!(
                    "reading count {} is not a multiple of {HOURS_PER_DAY}",
                    readings.len()
                ),
            ));
        }

        let days = readings
            .chunks_exact(HOURS_PER_DAY)
            .map(|chunk| {
                let mut row = [0.0; HOURS_PER_DAY];
                for (slot, reading) in row.iter_mut().zip(chunk) {
                    *slot = reading.filter(|value| value.is_finite()).unwrap_or(0.0);
                }
                (row, row.map(|value| config.panel.harvest_mw(value)))
            })
            .collect();

        Self::from_days(location, year, days, config, rng)
    }

    /// Build a trace from hourly harvest values already expressed in mW
    ///
    /// Radiation is recovered through the panel's linear conversion so that
    /// either classification basis can be applied. Non-finite values are
    /// treated as zero.
    pub fn from_harvest<R>(
        location: &str,
        year: i32,
        energy: Vec<DayRow>,
        config: &TraceConfig,
        rng: &mut R,
    ) -> Result<Self, EnvError>
    where
        R: Rng + ?Sized,
    {
        let factor = config.panel.conversion_factor();
        if !(factor.is_finite() && factor > 0.0) {
            return Err(EnvError::InvalidConfig(format!(
                "panel conversion factor must be positive, got {factor}"
            )));
        }
        if energy.is_empty() {
            return Err(EnvError::unavailable(location, year, "no readings"));
        }

        let days = energy
            .into_iter()
            .map(|row| {
                let row = row.map(|mw| if mw.is_finite() { mw } else { 0.0 });
                (row.map(|mw| mw / factor), row)
            })
            .collect();

        Self::from_days(location, year, days, config, rng)
    }

    /// `days` pairs each day's radiation row with its harvest row
    fn from_days<R>(
        location: &str,
        year: i32,
        mut days: Vec<(DayRow, DayRow)>,
        config: &TraceConfig,
        rng: &mut R,
    ) -> Result<Self, EnvError>
    where
        R: Rng + ?Sized,
    {
        config.validate()?;

        if config.shuffle_days {
            days.shuffle(rng);
        }
        let (radiation, energy): (Vec<DayRow>, Vec<DayRow>) = days.into_iter().unzip();

        let day_types: Vec<DayType> = radiation
            .iter()
            .zip(&energy)
            .map(|(radiation_row, energy_row)| {
                let total: f64 = match config.day_types.basis {
                    ClassificationBasis::Radiation => radiation_row.iter().sum(),
                    ClassificationBasis::HarvestedEnergy => energy_row.iter().sum(),
                };
                config.day_types.classify(total)
            })
            .collect();

        let days_by_type: [Vec<usize>; DayType::COUNT] = std::array::from_fn(|class| {
            let mut days: Vec<usize> = day_types
                .iter()
                .enumerate()
                .filter(|(_, day_type)| day_type.index() == class)
                .map(|(day, _)| day)
                .collect();
            days.shuffle(rng);
            days
        });

        let trace = Self {
            location: location.to_string(),
            year,
            radiation,
            energy,
            day_types,
            days_by_type,
        };

        if let Some(calendar_days) = days_in_year(year) {
            if calendar_days != trace.num_days() {
                warn!(
                    location,
                    year,
                    num_days = trace.num_days(),
                    calendar_days,
                    "trace length differs from calendar year"
                );
            }
        }

        info!(
            location,
            year,
            num_days = trace.num_days(),
            basis = %config.day_types.basis,
            shuffled = config.shuffle_days,
            days_per_type = ?trace.days_per_type(),
            "loaded energy trace"
        );

        Ok(trace)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn num_days(&self) -> usize {
        self.energy.len()
    }

    pub fn hours_per_day(&self) -> usize {
        HOURS_PER_DAY
    }

    /// Harvest in mW for a day and hour
    ///
    /// # Panics
    /// Panics if `day` or `hour` is out of range.
    pub fn harvest(&self, day: usize, hour: usize) -> f64 {
        self.energy[day][hour]
    }

    /// Radiation reading (MJ/m²) for a day and hour
    pub fn radiation(&self, day: usize, hour: usize) -> f64 {
        self.radiation[day][hour]
    }

    /// Hourly harvest of one day
    pub fn day(&self, day: usize) -> &DayRow {
        &self.energy[day]
    }

    /// Total harvest of one day in mWh
    pub fn daily_energy(&self, day: usize) -> f64 {
        self.energy[day].iter().sum()
    }

    pub fn day_type(&self, day: usize) -> DayType {
        self.day_types[day]
    }

    pub fn day_types(&self) -> &[DayType] {
        &self.day_types
    }

    /// Day indices of one type, in shuffled order
    pub fn days_of_type(&self, day_type: DayType) -> &[usize] {
        &self.days_by_type[day_type.index()]
    }

    pub fn days_per_type(&self) -> [usize; DayType::COUNT] {
        std::array::from_fn(|class| self.days_by_type[class].len())
    }

    pub fn summary(&self) -> TraceSummary {
        let total_energy_mwh: f64 = (0..self.num_days()).map(|day| self.daily_energy(day)).sum();
        TraceSummary {
            location: self.location.clone(),
            year: self.year,
            num_days: self.num_days(),
            days_per_type: self.days_per_type(),
            total_energy_mwh,
            mean_daily_energy_mwh: total_energy_mwh / self.num_days() as f64,
        }
    }
}

fn days_in_year(year: i32) -> Option<usize> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
    usize::try_from((end - start).num_days()).ok()
}
