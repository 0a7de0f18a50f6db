//! # Trip Inference
//!
//! Trip detection and complete-day accounting for travel survey GPS data.
//!
//! This library provides:
//! - Trip detection: a multi-pass pipeline turning a raw, noisy stream of
//!   GPS fixes into an ordered list of coded trips, including inferred
//!   "missing" trips where the data has unexplained gaps
//! - Complete-day accounting: one summary per local calendar day describing
//!   whether the participant's travel was fully recorded
//! - Parallel batch processing across users
//!
//! ## Features
//!
//! - **`parallel`** - Run batches of users in parallel with rayon
//! - **`cli`** - Build the `trip-inference-cli` binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trip_inference::{detect_trips, RawFix, ReferenceData, TripCode, TripConfig};
//!
//! let t0 = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
//! let fixes: Vec<RawFix> = (0..11)
//!     .map(|i| RawFix::new(45.5000 + i as f64 * 0.0005, -73.5700, 10.0, 1.5,
//!                          t0 + chrono::Duration::seconds(i * 60)))
//!     .collect();
//!
//! let trips = detect_trips(&fixes, &ReferenceData::default(), &TripConfig::default()).unwrap();
//! assert_eq!(trips.len(), 1);
//! assert_eq!(trips[0].code, TripCode::CompleteTrip);
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TripError};

// Geographic utilities (haversine, planar distances)
pub mod geo_utils;

// Planar projection
pub mod projection;
pub use projection::UtmProjection;

// Trip detection pipeline
pub mod trips;
pub use trips::{
    detect_trips, detect_trips_batch, summarize_trips, BatchResult, ReferenceData, SubwayNetwork,
    Trip, TripCode, TripPoint, TripStatistics, UserInput,
};

// Complete-day accounting
pub mod complete_days;
pub use complete_days::{summarize_complete_days, CompleteDaysConfig, DayStatus, DaySummary};

// CSV input adapter
pub mod input;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoord {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the coordinate is finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One raw GPS observation from the survey app.
///
/// Timestamps are UTC without an attached offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub h_accuracy: f64,
    /// Reported device speed in m/s
    pub speed: f64,
    pub timestamp: NaiveDateTime,
}

impl RawFix {
    pub fn new(
        latitude: f64,
        longitude: f64,
        h_accuracy: f64,
        speed: f64,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            latitude,
            longitude,
            h_accuracy,
            speed,
            timestamp,
        }
    }

    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.latitude, self.longitude)
    }
}

/// A place the participant declared in the survey (home, work, study...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownLocation {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl KnownLocation {
    pub fn new(label: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            label: label.to_string(),
            latitude,
            longitude,
        }
    }

    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.latitude, self.longitude)
    }
}

/// Configuration for trip detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    /// Fixes with a horizontal accuracy above this are dropped.
    /// Default: 50.0 meters
    pub accuracy_cutoff_meters: f64,

    /// Implied speed above which a point may be a positioning spike.
    /// Default: 60.0 km/h
    pub erroneous_speed_kph: f64,

    /// Time gap that starts a new segment.
    /// Default: 360 seconds
    pub break_interval_seconds: i64,

    /// Distance from a subway entrance for a point to count as "at" it.
    /// Default: 300.0 meters
    pub subway_buffer_meters: f64,

    /// Longest gap that subway travel can explain.
    /// Default: 3600 seconds
    pub subway_max_gap_seconds: i64,

    /// Slowest implied speed between entrances that still counts as a ride.
    /// Default: 5.0 km/h
    pub subway_min_speed_kph: f64,

    /// Implied speed across a gap above which the gap is linked as walking.
    /// Default: 15.0 km/h
    pub min_walking_speed_kph: f64,

    /// Time window for attaching a lone point to a neighboring trip.
    /// Default: 1200 seconds (20 minutes)
    pub single_point_max_gap_seconds: i64,

    /// Distance window for attaching a lone point to a neighboring trip.
    /// Default: 150.0 meters
    pub single_point_max_distance_meters: f64,

    /// Radius around a known location in which a lone point is kept.
    /// Default: 150.0 meters
    pub known_location_radius_meters: f64,

    /// Shortest distance considered a real trip (or a real gap).
    /// Default: 250.0 meters
    pub min_trip_length_meters: f64,

    /// Gaps up to this distance are modeled as GPS warm-up lag.
    /// Default: 750.0 meters
    pub cold_start_distance_meters: f64,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            accuracy_cutoff_meters: 50.0,
            erroneous_speed_kph: 60.0,
            break_interval_seconds: 360,
            subway_buffer_meters: 300.0,
            subway_max_gap_seconds: 3600,
            subway_min_speed_kph: 5.0,
            min_walking_speed_kph: 15.0,
            single_point_max_gap_seconds: 1200,
            single_point_max_distance_meters: 150.0,
            known_location_radius_meters: 150.0,
            min_trip_length_meters: 250.0,
            cold_start_distance_meters: 750.0,
        }
    }
}

impl TripConfig {
    /// Reject thresholds that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        let distances = [
            ("accuracy_cutoff_meters", self.accuracy_cutoff_meters),
            ("erroneous_speed_kph", self.erroneous_speed_kph),
            ("subway_buffer_meters", self.subway_buffer_meters),
            ("subway_min_speed_kph", self.subway_min_speed_kph),
            ("min_walking_speed_kph", self.min_walking_speed_kph),
            (
                "single_point_max_distance_meters",
                self.single_point_max_distance_meters,
            ),
            (
                "known_location_radius_meters",
                self.known_location_radius_meters,
            ),
            ("min_trip_length_meters", self.min_trip_length_meters),
            ("cold_start_distance_meters", self.cold_start_distance_meters),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(TripError::Config {
                    message: format!("{} must be a positive number, got {}", name, value),
                });
            }
        }

        let durations = [
            ("break_interval_seconds", self.break_interval_seconds),
            ("subway_max_gap_seconds", self.subway_max_gap_seconds),
            (
                "single_point_max_gap_seconds",
                self.single_point_max_gap_seconds,
            ),
        ];
        for (name, value) in durations {
            if value <= 0 {
                return Err(TripError::Config {
                    message: format!("{} must be positive, got {}", name, value),
                });
            }
        }
        Ok(())
    }
}
