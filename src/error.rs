//! Unified error handling for the trip-inference library.
//!
//! Every fatal condition aborts only the current user's run. Degenerate
//! input (too few usable points) is not an error and never shows up here.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Unified error type for trip-inference operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TripError {
    /// An input fix is earlier than the one before it
    #[error("Fix {index} at {current} is earlier than the previous fix at {previous}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
    /// An input fix has non-finite or out-of-range coordinates
    #[error("Fix {index} has invalid coordinates: {message}")]
    InvalidCoordinates { index: usize, message: String },
    /// Reference data was supplied for a rule but is unusable
    #[error("Missing reference data: {message}")]
    MissingReferenceData { message: String },
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// Timezone name not found in the tz database
    #[error("Unknown timezone '{name}'")]
    UnknownTimezone { name: String },
    /// Integer does not correspond to any trip code
    #[error("Unknown trip code {code}")]
    UnknownTripCode { code: u16 },
    /// Input adapter error (CSV parsing, malformed rows)
    #[error("Input error: {message}")]
    Input { message: String },
}

/// Result type alias for trip-inference operations.
pub type Result<T> = std::result::Result<T, TripError>;

impl From<csv::Error> for TripError {
    fn from(err: csv::Error) -> Self {
        TripError::Input {
            message: err.to_string(),
        }
    }
}
