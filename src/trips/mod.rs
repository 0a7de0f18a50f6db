//! # Trip Detection
//!
//! Turns one user's time-ordered GPS fixes into an ordered list of coded trips.
//!
//! ## Pipeline
//! 1. Project fixes to a UTM frame; drop inaccurate fixes and positioning spikes
//! 2. Break the stream into segments at time gaps longer than the break interval
//! 3. Link segments across gaps explained by subway travel, then by sustained
//!    movement faster than walking
//! 4. Attach lone points to a nearby trip, keep them at known locations, or
//!    discard them
//! 5. Classify the gaps left between trips (too short, known-location ping,
//!    subway, cold start, general)
//! 6. Interleave inferred gaps with trips and assign final trip codes
//!
//! Every stage takes and returns owned values; nothing is shared between
//! users, so batches can run in parallel.

mod annotate;
mod cleaning;
mod linking;
mod missing;
mod segment;
mod segmentation;
mod single_points;
mod subway;

use std::collections::BTreeMap;

use log::{debug, info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TripError};
use crate::projection::UtmProjection;
use crate::{KnownLocation, RawFix, TripConfig};

pub use annotate::{annotate_trips, classify, merge_trips, Trip, TripCode, TripItem, TripPoint};
pub use cleaning::{filter_by_accuracy, filter_erroneous_distance, project_fixes};
pub use linking::{link_subway_trips, link_walking_trips};
pub use missing::{classify_gap, infer_missing_trips, GapCategory, MissingCategory, MissingTrip};
pub use segment::{CandidateTrip, LinkType, ProjectedPoint, Segment, TripLabel};
pub use segmentation::{into_candidate_trips, segment_points};
pub use single_points::reconcile_single_points;
pub use subway::{SubwayIndex, SubwayNetwork};

/// Reference data supplied alongside a user's fixes.
///
/// Both parts are optional: without a subway network the subway rules never
/// fire, and without known locations lone points are never kept as pings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub subway: Option<SubwayNetwork>,
    #[serde(default)]
    pub known_locations: Vec<KnownLocation>,
}

/// Run the full trip detection pipeline for one user.
///
/// Returns an empty list when fewer than two usable points survive cleaning.
pub fn detect_trips(
    fixes: &[RawFix],
    reference: &ReferenceData,
    config: &TripConfig,
) -> Result<Vec<Trip>> {
    detect_trips_with(
        fixes,
        reference.subway.as_ref(),
        &reference.known_locations,
        config,
    )
}

fn detect_trips_with(
    fixes: &[RawFix],
    subway: Option<&SubwayNetwork>,
    known_locations: &[KnownLocation],
    config: &TripConfig,
) -> Result<Vec<Trip>> {
    config.validate()?;
    let Some(first) = fixes.first() else {
        return Ok(Vec::new());
    };

    let projection = UtmProjection::for_coord(&first.coord());
    let projected = project_fixes(fixes, &projection)?;
    let subway_index = subway
        .map(|network| SubwayIndex::build(network, &projection, config.subway_buffer_meters))
        .transpose()?;
    let known: Vec<(f64, f64)> = known_locations
        .iter()
        .map(|loc| projection.project(&loc.coord()))
        .collect();

    let accurate = filter_by_accuracy(projected, config.accuracy_cutoff_meters);
    let cleaned = filter_erroneous_distance(accurate, config.erroneous_speed_kph);
    debug!(
        "[TripDetection] {} of {} fixes survive cleaning (UTM zone {})",
        cleaned.len(),
        fixes.len(),
        projection.zone()
    );
    if cleaned.len() < 2 {
        return Ok(Vec::new());
    }

    let segments = segment_points(cleaned, config.break_interval_seconds);
    debug!("[TripDetection] {} segments", segments.len());

    let candidates = into_candidate_trips(segments);
    let subway_linked = link_subway_trips(candidates, subway_index.as_ref(), config);
    let linked = link_walking_trips(subway_linked, config);
    let mut reconciled = reconcile_single_points(linked, &known, config);

    let missing = infer_missing_trips(&mut reconciled, subway_index.as_ref(), config);
    let items = merge_trips(reconciled, missing);
    let trips = annotate_trips(&items, config);

    debug!("[TripDetection] {} trips", trips.len());
    Ok(trips)
}

// ============================================================================
// Batch Processing
// ============================================================================

/// One user's input for batch processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    pub user_id: String,
    pub fixes: Vec<RawFix>,
    #[serde(default)]
    pub known_locations: Vec<KnownLocation>,
}

/// Outcome of a batch: trips for users that succeeded, errors for the rest.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub trips: BTreeMap<String, Vec<Trip>>,
    pub failures: Vec<(String, TripError)>,
}

/// Run trip detection for many users.
///
/// A failure aborts only that user's run; it is reported in
/// `BatchResult::failures` and the remaining users continue.
pub fn detect_trips_batch(
    users: &[UserInput],
    subway: Option<&SubwayNetwork>,
    config: &TripConfig,
) -> BatchResult {
    let run = |user: &UserInput| {
        let result = detect_trips_with(&user.fixes, subway, &user.known_locations, config);
        (user.user_id.clone(), result)
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(String, Result<Vec<Trip>>)> = users.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(String, Result<Vec<Trip>>)> = users.iter().map(run).collect();

    let mut batch = BatchResult::default();
    for (user_id, result) in results {
        match result {
            Ok(trips) => {
                batch.trips.insert(user_id, trips);
            }
            Err(err) => {
                warn!("[TripDetection] User {} failed: {}", user_id, err);
                batch.failures.push((user_id, err));
            }
        }
    }

    info!(
        "[TripDetection] Batch complete: {} users processed, {} failed",
        batch.trips.len(),
        batch.failures.len()
    );
    batch
}

// ============================================================================
// Statistics
// ============================================================================

/// Aggregate figures over one user's trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripStatistics {
    pub trip_count: u32,
    /// Keyed by integer trip code
    pub count_by_code: BTreeMap<u16, u32>,
    pub missing_count: u32,
    /// Meters across complete trips (with or without subway)
    pub complete_distance: f64,
}

/// Count trips per code and total the distance of complete trips.
pub fn summarize_trips(trips: &[Trip]) -> TripStatistics {
    let mut stats = TripStatistics {
        trip_count: trips.len() as u32,
        ..TripStatistics::default()
    };
    for trip in trips {
        *stats.count_by_code.entry(trip.code.code()).or_insert(0) += 1;
        if trip.code.is_missing() {
            stats.missing_count += 1;
        }
        if matches!(trip.code, TripCode::CompleteTrip | TripCode::CompleteTripSubway) {
            stats.complete_distance += trip.distance();
        }
    }
    stats
}
