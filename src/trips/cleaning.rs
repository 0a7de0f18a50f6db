//! Projection and outlier removal.

use log::debug;

use crate::error::{Result, TripError};
use crate::geo_utils::implied_speed;
use crate::projection::UtmProjection;
use crate::RawFix;

use super::segment::ProjectedPoint;

/// Project fixes into the planar frame, checking input invariants.
///
/// Equal consecutive timestamps are tolerated; a fix earlier than its
/// predecessor aborts the run.
pub fn project_fixes(fixes: &[RawFix], projection: &UtmProjection) -> Result<Vec<ProjectedPoint>> {
    let mut projected = Vec::with_capacity(fixes.len());
    for (index, fix) in fixes.iter().enumerate() {
        if !fix.coord().is_valid() {
            return Err(TripError::InvalidCoordinates {
                index,
                message: format!("({}, {})", fix.latitude, fix.longitude),
            });
        }
        if index > 0 && fix.timestamp < fixes[index - 1].timestamp {
            return Err(TripError::NonMonotonicTimestamps {
                index,
                previous: fixes[index - 1].timestamp,
                current: fix.timestamp,
            });
        }
        projected.push(ProjectedPoint::from_fix(fix, projection));
    }
    Ok(projected)
}

/// Drop points whose horizontal accuracy is worse than the cutoff.
pub fn filter_by_accuracy(points: Vec<ProjectedPoint>, cutoff_meters: f64) -> Vec<ProjectedPoint> {
    points
        .into_iter()
        .filter(|p| p.h_accuracy <= cutoff_meters)
        .collect()
}

/// Drop single-point positioning spikes.
///
/// A point is a spike when reaching it from the last kept point implies a
/// speed above `max_speed_kph` and the following point is closer to the last
/// kept point than the spike is. One forward pass with one point of
/// lookahead; a kept point is never revisited. The first point is always kept.
pub fn filter_erroneous_distance(
    points: Vec<ProjectedPoint>,
    max_speed_kph: f64,
) -> Vec<ProjectedPoint> {
    let mut kept: Vec<ProjectedPoint> = Vec::with_capacity(points.len());
    let mut dropped = 0usize;
    let mut iter = points.into_iter().peekable();

    while let Some(point) = iter.next() {
        if let Some(last) = kept.last() {
            let distance = last.distance_to(&point);
            let speed_kph = match implied_speed(distance, last.seconds_until(&point)) {
                Some(mps) => mps * 3.6,
                None if distance > 0.0 => f64::INFINITY,
                None => 0.0,
            };
            if speed_kph > max_speed_kph {
                if let Some(next) = iter.peek() {
                    if last.distance_to(next) < distance {
                        dropped += 1;
                        continue;
                    }
                }
            }
        }
        kept.push(point);
    }

    if dropped > 0 {
        debug!("[TripDetection] Dropped {} spike points", dropped);
    }
    kept
}
