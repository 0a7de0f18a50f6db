//! Classification of unexplained gaps between consecutive trips.
//!
//! Every gap is classified first, then the classifications are acted on:
//! most produce a `MissingTrip`, a cold start instead rewrites the start of
//! the following trip. Classifying up front lets a known-location ping
//! claim the gap leading into it before that gap is reported on its own.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::TripConfig;

use super::segment::{CandidateTrip, ProjectedPoint, Segment, TripLabel};
use super::subway::SubwayIndex;

/// How a gap between two trips is explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapCategory {
    TooShort,
    KnownLocationPing,
    Subway,
    ColdStart,
    General,
}

/// Gap categories that materialize as an inferred trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCategory {
    TooShort,
    KnownLocationPing,
    Subway,
    General,
}

/// An inferred gap in the record, not an observed trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingTrip {
    pub category: MissingCategory,
    pub start: ProjectedPoint,
    pub end: ProjectedPoint,
    pub distance: f64,
    pub duration_seconds: i64,
    /// Index of the candidate trip this gap leads into
    pub before_trip: usize,
}

impl MissingTrip {
    fn between(
        category: MissingCategory,
        start: &ProjectedPoint,
        end: &ProjectedPoint,
        before_trip: usize,
    ) -> Self {
        Self {
            category,
            distance: start.distance_to(end),
            duration_seconds: start.seconds_until(end),
            start: start.clone(),
            end: end.clone(),
            before_trip,
        }
    }
}

/// Classify the gap from `a` to `b`, or `None` when there is no gap.
pub fn classify_gap(
    a: &CandidateTrip,
    b: &CandidateTrip,
    subway: Option<&SubwayIndex>,
    config: &TripConfig,
) -> Option<GapCategory> {
    let (end, start) = (a.end(), b.start());
    let distance = end.distance_to(start);
    if distance == 0.0 {
        return None;
    }

    let category = if distance < config.min_trip_length_meters {
        GapCategory::TooShort
    } else if a.has_label(TripLabel::KnownLocationPing) {
        GapCategory::KnownLocationPing
    } else if subway.is_some_and(|index| index.near_distinct_entrances(end, start)) {
        GapCategory::Subway
    } else if distance <= config.cold_start_distance_meters {
        GapCategory::ColdStart
    } else {
        GapCategory::General
    };
    Some(category)
}

/// Infer missing trips between consecutive candidate trips.
///
/// Cold-start gaps are applied in place: the previous trip's end point is
/// copied onto the front of the following trip as a cold-start segment.
/// Pings expanded into missing trips are labeled `PingExpanded`.
pub fn infer_missing_trips(
    trips: &mut [CandidateTrip],
    subway: Option<&SubwayIndex>,
    config: &TripConfig,
) -> Vec<MissingTrip> {
    let categories: Vec<Option<GapCategory>> = trips
        .windows(2)
        .map(|pair| classify_gap(&pair[0], &pair[1], subway, config))
        .collect();

    let mut missing = Vec::new();
    let mut cold_starts = 0usize;

    for (i, category) in categories.iter().enumerate() {
        let Some(category) = *category else {
            continue;
        };

        if category == GapCategory::KnownLocationPing {
            let ping = trips[i].start().clone();
            // A preceding expanded ping already reported the span into this one
            let after_ping =
                i > 0 && categories[i - 1] == Some(GapCategory::KnownLocationPing);
            if i > 0 && !after_ping {
                missing.push(MissingTrip::between(
                    MissingCategory::KnownLocationPing,
                    trips[i - 1].end(),
                    &ping,
                    i,
                ));
            }
            missing.push(MissingTrip::between(
                MissingCategory::KnownLocationPing,
                &ping,
                trips[i + 1].start(),
                i + 1,
            ));
            trips[i].labels.insert(TripLabel::PingExpanded);
            continue;
        }

        // The gap into an expanded ping is reported by the expansion
        if categories.get(i + 1) == Some(&Some(GapCategory::KnownLocationPing)) {
            continue;
        }

        let (end, start) = (trips[i].end(), trips[i + 1].start());
        let record = match category {
            GapCategory::TooShort => Some(MissingCategory::TooShort),
            GapCategory::Subway => Some(MissingCategory::Subway),
            GapCategory::General => Some(MissingCategory::General),
            GapCategory::KnownLocationPing => None,
            GapCategory::ColdStart => None,
        };
        match record {
            Some(missing_category) => {
                missing.push(MissingTrip::between(missing_category, end, start, i + 1));
            }
            None => {
                let mut segment = Segment::leading(trips[i + 1].first_segment().group_id, end.clone());
                segment.is_cold_start = true;
                trips[i + 1].prepend(segment);
                trips[i + 1].labels.insert(TripLabel::ColdStart);
                cold_starts += 1;
            }
        }
    }

    debug!(
        "[TripDetection] Inferred {} missing trips, {} cold starts",
        missing.len(),
        cold_starts
    );
    missing
}
