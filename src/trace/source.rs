//! # Radiation Sources
//!
//! Supply the flat sequence of hourly solar radiation readings for a
//! `(location, year)` pair. A reading that is missing or not numeric is
//! reported as `None` so the trace can keep day alignment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::EnvError;

/// Provider of yearly hourly radiation readings
pub trait RadiationSource {
    /// Hourly readings for the whole year, in file order
    fn readings(&self, location: &str, year: i32) -> Result<Vec<Option<f64>>, EnvError>;
}

/// Layout of the delimited yearly files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSourceConfig {
    /// Directory holding one sub-directory per location
    pub data_dir: PathBuf,
    /// Title rows preceding the column header
    pub header_rows: usize,
    /// A column header line follows the title rows
    pub column_header: bool,
    /// Zero-based column holding the radiation reading
    pub column: usize,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvSourceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            header_rows: 4,
            column_header: true,
            column: 4,
            delimiter: b',',
        }
    }
}

/// Reads `<data_dir>/<location>/<year>.csv`
///
/// Records are read as raw bytes: the published weather tables use a
/// non-UTF-8 encoding for their titles while numeric fields are plain ASCII.
#[derive(Debug, Clone)]
pub struct CsvRadiationSource {
    config: CsvSourceConfig,
}

impl CsvRadiationSource {
    pub fn new(config: CsvSourceConfig) -> Self {
        Self { config }
    }

    /// Path of the file for a location and year
    pub fn path_for(&self, location: &str, year: i32) -> PathBuf {
        self.config
            .data_dir
            .join(location)
            .join(format!("{year}.csv"))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<Option<f64>>, csv::Error> {
        let mut file = BufReader::new(File::open(path)?);
        // Title rows count as raw lines, blank ones included
        let mut line = Vec::new();
        for _ in 0..self.config.header_rows {
            line.clear();
            if file.read_until(b'\n', &mut line)? == 0 {
                break;
            }
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.config.column_header)
            .flexible(true)
            .delimiter(self.config.delimiter)
            .from_reader(file);

        let mut readings = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            readings.push(record.get(self.config.column).and_then(parse_reading));
        }
        Ok(readings)
    }
}

impl RadiationSource for CsvRadiationSource {
    fn readings(&self, location: &str, year: i32) -> Result<Vec<Option<f64>>, EnvError> {
        let path = self.path_for(location, year);
        if !path.is_file() {
            return Err(EnvError::unavailable(
                location,
                year,
                format!("file not found: {}", path.display()),
            ));
        }

        let readings = self
            .read_file(&path)
            .map_err(|e| EnvError::unavailable(location, year, e.to_string()))?;
        let missing = readings.iter().filter(|r| r.is_none()).count();
        debug!(path = %path.display(), readings = readings.len(), missing, "read radiation file");
        Ok(readings)
    }
}

fn parse_reading(field: &[u8]) -> Option<f64> {
    std::str::from_utf8(field)
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Readings held in memory, keyed by location and year
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    traces: HashMap<(String, i32), Vec<Option<f64>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register readings for a location and year
    pub fn insert(&mut self, location: &str, year: i32, readings: Vec<Option<f64>>) {
        self.traces.insert((location.to_string(), year), readings);
    }

    /// Builder form of [`InMemorySource::insert`] for fully present readings
    pub fn with_readings(mut self, location: &str, year: i32, readings: &[f64]) -> Self {
        self.insert(location, year, readings.iter().copied().map(Some).collect());
        self
    }
}

impl RadiationSource for InMemorySource {
    fn readings(&self, location: &str, year: i32) -> Result<Vec<Option<f64>>, EnvError> {
        self.traces
            .get(&(location.to_string(), year))
            .cloned()
            .ok_or_else(|| EnvError::unavailable(location, year, "no readings registered"))
    }
}
