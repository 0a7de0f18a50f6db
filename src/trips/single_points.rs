//! Disposal of isolated one-point trips.
//!
//! A lone point either joins a neighboring trip, stays as a "ping" at a
//! known location, or is discarded as noise.

use log::debug;

use crate::geo_utils::planar_distance;
use crate::TripConfig;

use super::segment::{CandidateTrip, ProjectedPoint, TripLabel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attach {
    Previous,
    Next,
}

/// Time gap in seconds if `neighbor_point` qualifies as an attach target.
fn candidacy(
    point: &ProjectedPoint,
    neighbor_point: &ProjectedPoint,
    config: &TripConfig,
) -> Option<i64> {
    let gap = point.seconds_until(neighbor_point).abs();
    let distance = point.distance_to(neighbor_point);
    if gap <= config.single_point_max_gap_seconds
        || distance <= config.single_point_max_distance_meters
    {
        Some(gap)
    } else {
        None
    }
}

/// Attach, keep or discard every single-point trip.
///
/// `known_locations` are planar positions in the run's frame.
pub fn reconcile_single_points(
    trips: Vec<CandidateTrip>,
    known_locations: &[(f64, f64)],
    config: &TripConfig,
) -> Vec<CandidateTrip> {
    let mut slots: Vec<Option<CandidateTrip>> = trips.into_iter().map(Some).collect();
    let (mut attached, mut kept, mut discarded) = (0usize, 0usize, 0usize);

    for i in 0..slots.len() {
        let is_single = matches!(&slots[i], Some(t) if t.is_single_point());
        if !is_single {
            continue;
        }
        let Some(mut lone) = slots[i].take() else {
            continue;
        };
        let point = lone.start().clone();

        let prev_idx = (0..i).rev().find(|&j| slots[j].is_some());
        let prev_gap = prev_idx
            .and_then(|j| slots[j].as_ref())
            .and_then(|t| candidacy(&point, t.end(), config));
        let next_gap = slots
            .get(i + 1)
            .and_then(|s| s.as_ref())
            .and_then(|t| candidacy(&point, t.start(), config));

        let target = match (prev_gap, next_gap) {
            (Some(p), Some(n)) if n < p => Some(Attach::Next),
            (Some(_), _) => Some(Attach::Previous),
            (None, Some(_)) => Some(Attach::Next),
            (None, None) => None,
        };

        match (target, prev_idx) {
            (Some(Attach::Previous), Some(j)) => {
                if let Some(prev) = slots[j].as_mut() {
                    let mut segment = lone.segments.remove(0);
                    segment.points[0].timestamp = prev.end().timestamp;
                    prev.append(segment);
                    attached += 1;
                }
            }
            (Some(Attach::Next), _) => {
                if let Some(next) = slots[i + 1].as_mut() {
                    let mut segment = lone.segments.remove(0);
                    segment.points[0].timestamp = next.start().timestamp;
                    next.prepend(segment);
                    attached += 1;
                }
            }
            _ => {
                let at_known_location = known_locations.iter().any(|&loc| {
                    planar_distance(point.planar(), loc)
                        <= config.known_location_radius_meters
                });
                if at_known_location {
                    lone.labels.insert(TripLabel::KnownLocationPing);
                    slots[i] = Some(lone);
                    kept += 1;
                } else {
                    discarded += 1;
                }
            }
        }
    }

    debug!(
        "[TripDetection] Single points: {} attached, {} kept at known locations, {} discarded",
        attached, kept, discarded
    );
    slots.into_iter().flatten().collect()
}
