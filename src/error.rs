use thiserror::Error;

use crate::trace::DayType;

/// Errors raised while building or driving the simulation environment
#[derive(Debug, Error)]
pub enum EnvError {
    /// The yearly trace could not be obtained or is malformed
    #[error("Data unavailable for {location}/{year}: {reason}")]
    DataUnavailable {
        location: String,
        year: i32,
        reason: String,
    },

    /// A day-type restricted cursor was requested for a class with no days
    #[error("No days of type {0} in trace")]
    EmptyDayType(DayType),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EnvError {
    pub(crate) fn unavailable(location: &str, year: i32, reason: impl Into<String>) -> Self {
        EnvError::DataUnavailable {
            location: location.to_string(),
            year,
            reason: reason.into(),
        }
    }
}

impl From<validator::ValidationErrors> for EnvError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EnvError::InvalidConfig(errors.to_string())
    }
}
