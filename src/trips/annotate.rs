//! Interleave observed and inferred trips and assign final trip codes.

use std::fmt;

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::TripError;
use crate::{GeoCoord, TripConfig};

use super::missing::{MissingCategory, MissingTrip};
use super::segment::{CandidateTrip, ProjectedPoint, Segment, TripLabel};

/// Final classification of an output trip.
///
/// Codes 100-199 denote inferred gaps in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum TripCode {
    CompleteTrip,
    CompleteTripSubway,
    MissingTrip,
    MissingTripSubway,
    MissingTripTooShort,
    MissingTripKnownLocationPing,
    SinglePoint,
    DistanceTooShort,
}

impl TripCode {
    pub const ALL: [TripCode; 8] = [
        TripCode::CompleteTrip,
        TripCode::CompleteTripSubway,
        TripCode::MissingTrip,
        TripCode::MissingTripSubway,
        TripCode::MissingTripTooShort,
        TripCode::MissingTripKnownLocationPing,
        TripCode::SinglePoint,
        TripCode::DistanceTooShort,
    ];

    pub fn code(&self) -> u16 {
        match self {
            TripCode::CompleteTrip => 1,
            TripCode::CompleteTripSubway => 2,
            TripCode::MissingTrip => 101,
            TripCode::MissingTripSubway => 102,
            TripCode::MissingTripTooShort => 103,
            TripCode::MissingTripKnownLocationPing => 104,
            TripCode::SinglePoint => 201,
            TripCode::DistanceTooShort => 202,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TripCode::CompleteTrip => "complete trip",
            TripCode::CompleteTripSubway => "complete trip - subway",
            TripCode::MissingTrip => "missing trip",
            TripCode::MissingTripSubway => "missing trip - subway",
            TripCode::MissingTripTooShort => "missing trip - less than min trip length",
            TripCode::MissingTripKnownLocationPing => "missing trip - known location ping",
            TripCode::SinglePoint => "single point",
            TripCode::DistanceTooShort => "distance too short",
        }
    }

    /// Whether the code marks a gap in the record rather than an observed trip.
    pub fn is_missing(&self) -> bool {
        (100..200).contains(&self.code())
    }
}

impl fmt::Display for TripCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

impl From<TripCode> for u16 {
    fn from(code: TripCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for TripCode {
    type Error = TripError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        TripCode::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(TripError::UnknownTripCode { code })
    }
}

/// One point of an output trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub h_accuracy: f64,
    /// UTC
    pub timestamp: NaiveDateTime,
    /// Meters from the previous point of this trip
    pub distance_before: f64,
    /// Cumulative meters since the trip's first point, along every point of
    /// the trip including jumps between linked segments and leading
    /// cold-start or folded points. Trip codes are decided on the in-segment
    /// distance only, so a `DistanceTooShort` trip can end above the minimum.
    pub trip_distance: f64,
    /// Seconds since the previous point of this trip
    pub duration_before: i64,
}

impl TripPoint {
    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.latitude, self.longitude)
    }
}

/// A finished trip: observed travel or an inferred gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// 1-based position in time order
    pub num: u32,
    pub code: TripCode,
    /// Never empty
    pub points: Vec<TripPoint>,
}

impl Trip {
    pub fn start(&self) -> &TripPoint {
        &self.points[0]
    }

    pub fn end(&self) -> &TripPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn distance(&self) -> f64 {
        self.end().trip_distance
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end().timestamp - self.start().timestamp).num_seconds()
    }
}

/// An item of the merged timeline.
#[derive(Debug, Clone)]
pub enum TripItem {
    Observed(CandidateTrip),
    Inferred(MissingTrip),
}

impl TripItem {
    pub fn points(&self) -> Vec<&ProjectedPoint> {
        match self {
            TripItem::Observed(trip) => trip.points().collect(),
            TripItem::Inferred(missing) => vec![&missing.start, &missing.end],
        }
    }
}

/// Assign a trip code. First matching rule wins:
///
/// 1. inferred gaps map by category
/// 2. observed trips shorter than the minimum trip length are too short
/// 3. trips with a sub-minimum gap folded in are complete (subway when
///    subway-linked), or a single point when that is all they hold
/// 4. everything else is complete, via subway when subway-linked
///
/// Distance here is `CandidateTrip::distance`, which leaves out jumps
/// between segments and leading cold-start or folded points. Rule 2 runs
/// first, so the single-point arm of rule 3 cannot fire in practice: a
/// lone point has zero distance, and a folded trip holds at least two
/// points. `TripCode::SinglePoint` is kept for the code table only.
pub fn classify(item: &TripItem, config: &TripConfig) -> TripCode {
    match item {
        TripItem::Inferred(missing) => match missing.category {
            MissingCategory::General => TripCode::MissingTrip,
            MissingCategory::Subway => TripCode::MissingTripSubway,
            MissingCategory::TooShort => TripCode::MissingTripTooShort,
            MissingCategory::KnownLocationPing => TripCode::MissingTripKnownLocationPing,
        },
        TripItem::Observed(trip) => {
            let subway = trip.has_label(TripLabel::SubwayLink);
            if trip.distance() < config.min_trip_length_meters {
                TripCode::DistanceTooShort
            } else if trip.has_label(TripLabel::LtMinTripLength) {
                if subway {
                    TripCode::CompleteTripSubway
                } else if trip.is_single_point() {
                    TripCode::SinglePoint
                } else {
                    TripCode::CompleteTrip
                }
            } else if subway {
                TripCode::CompleteTripSubway
            } else {
                TripCode::CompleteTrip
            }
        }
    }
}

/// Interleave candidate trips with the missing trips leading into them.
///
/// A too-short gap directly ahead of a candidate trip is not emitted; its
/// start point is folded onto the front of that trip, which is labeled
/// `LtMinTripLength`. Pings that were expanded into missing trips are
/// replaced by those records.
pub fn merge_trips(trips: Vec<CandidateTrip>, missing: Vec<MissingTrip>) -> Vec<TripItem> {
    let mut items = Vec::with_capacity(trips.len() + missing.len());
    let mut missing = missing.into_iter().peekable();
    let mut folded = 0usize;

    for (idx, mut trip) in trips.into_iter().enumerate() {
        let expanded = trip.has_label(TripLabel::PingExpanded);
        while let Some(gap) = missing.next_if(|m| m.before_trip <= idx) {
            if gap.category == MissingCategory::TooShort && gap.before_trip == idx && !expanded {
                trip.prepend(Segment::leading(trip.first_segment().group_id, gap.start));
                trip.labels.insert(TripLabel::LtMinTripLength);
                folded += 1;
            } else {
                items.push(TripItem::Inferred(gap));
            }
        }
        if !expanded {
            items.push(TripItem::Observed(trip));
        }
    }
    items.extend(missing.map(TripItem::Inferred));

    if folded > 0 {
        debug!("[TripDetection] Folded {} too-short gaps into trips", folded);
    }
    items
}

/// Build numbered output trips from the merged timeline.
pub fn annotate_trips(items: &[TripItem], config: &TripConfig) -> Vec<Trip> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| Trip {
            num: i as u32 + 1,
            code: classify(item, config),
            points: output_points(&item.points()),
        })
        .collect()
}

fn output_points(points: &[&ProjectedPoint]) -> Vec<TripPoint> {
    let mut out: Vec<TripPoint> = Vec::with_capacity(points.len());
    let mut trip_distance = 0.0;
    for (i, p) in points.iter().enumerate() {
        let (distance_before, duration_before) = if i == 0 {
            (0.0, 0)
        } else {
            let prev = points[i - 1];
            (prev.distance_to(p), prev.seconds_until(p))
        };
        trip_distance += distance_before;
        out.push(TripPoint {
            latitude: p.latitude,
            longitude: p.longitude,
            h_accuracy: p.h_accuracy,
            timestamp: p.timestamp,
            distance_before,
            trip_distance,
            duration_before,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::segment::test_support::{point, trip};
    use crate::trips::segment::LinkType;

    fn gap(category: MissingCategory, from: ProjectedPoint, to: ProjectedPoint, before: usize) -> MissingTrip {
        MissingTrip {
            category,
            distance: from.distance_to(&to),
            duration_seconds: from.seconds_until(&to),
            start: from,
            end: to,
            before_trip: before,
        }
    }

    #[test]
    fn test_trip_code_roundtrip_and_range() {
        for code in TripCode::ALL {
            assert_eq!(TripCode::try_from(code.code()).unwrap(), code);
        }
        assert!(TripCode::try_from(7).is_err());
        assert!(TripCode::MissingTripSubway.is_missing());
        assert!(!TripCode::DistanceTooShort.is_missing());
        assert!(!TripCode::CompleteTrip.is_missing());
    }

    #[test]
    fn test_trip_code_serializes_as_integer() {
        let json = serde_json::to_string(&TripCode::MissingTripKnownLocationPing).unwrap();
        assert_eq!(json, "104");
        let code: TripCode = serde_json::from_str("2").unwrap();
        assert_eq!(code, TripCode::CompleteTripSubway);
    }

    #[test]
    fn test_classify_precedence() {
        let config = TripConfig::default();
        let short = trip(1.0, &[(0.0, 0.0, 0), (100.0, 0.0, 5)]);
        assert_eq!(
            classify(&TripItem::Observed(short), &config),
            TripCode::DistanceTooShort
        );

        let long = trip(1.0, &[(0.0, 0.0, 0), (1000.0, 0.0, 5)]);
        assert_eq!(
            classify(&TripItem::Observed(long.clone()), &config),
            TripCode::CompleteTrip
        );

        let mut subway = long.clone();
        subway.link(trip(2.0, &[(3000.0, 0.0, 20), (3500.0, 0.0, 25)]), LinkType::Subway);
        assert_eq!(
            classify(&TripItem::Observed(subway.clone()), &config),
            TripCode::CompleteTripSubway
        );

        let mut folded = subway;
        folded.labels.insert(TripLabel::LtMinTripLength);
        assert_eq!(
            classify(&TripItem::Observed(folded), &config),
            TripCode::CompleteTripSubway
        );

        let general = gap(MissingCategory::General, point(0.0, 0.0, 0), point(5000.0, 0.0, 60), 1);
        assert_eq!(classify(&TripItem::Inferred(general), &config), TripCode::MissingTrip);
    }

    #[test]
    fn test_too_short_gap_folded_into_next_trip() {
        let trips = vec![
            trip(1.0, &[(0.0, 0.0, 0), (1000.0, 0.0, 10)]),
            trip(2.0, &[(1100.0, 0.0, 60), (3000.0, 0.0, 70)]),
        ];
        let missing = vec![gap(
            MissingCategory::TooShort,
            trips[0].end().clone(),
            trips[1].start().clone(),
            1,
        )];
        let items = merge_trips(trips, missing);
        assert_eq!(items.len(), 2);
        let TripItem::Observed(second) = &items[1] else {
            panic!("expected an observed trip");
        };
        assert!(second.has_label(TripLabel::LtMinTripLength));
        assert_eq!(second.first_segment().group_id, 1.5);
        assert_eq!(second.start().easting, 1000.0);
    }

    #[test]
    fn test_numbering_and_cumulative_distance() {
        let trips = vec![
            trip(1.0, &[(0.0, 0.0, 0), (300.0, 400.0, 10), (600.0, 800.0, 20)]),
            trip(2.0, &[(9000.0, 0.0, 120), (10000.0, 0.0, 130)]),
        ];
        let missing = vec![gap(
            MissingCategory::General,
            trips[0].end().clone(),
            trips[1].start().clone(),
            1,
        )];
        let output = annotate_trips(&merge_trips(trips, missing), &TripConfig::default());

        assert_eq!(output.len(), 3);
        assert_eq!(output.iter().map(|t| t.num).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(output[1].code, TripCode::MissingTrip);

        let first = &output[0];
        assert_eq!(first.points[0].trip_distance, 0.0);
        assert!((first.points[1].trip_distance - 500.0).abs() < 1e-9);
        assert!((first.distance() - 1000.0).abs() < 1e-9);
        assert_eq!(first.points[2].duration_before, 600);
        assert_eq!(first.duration_seconds(), 1200);
    }

    #[test]
    fn test_code_ignores_leading_cold_start_jump() {
        let mut short = trip(2.0, &[(1500.0, 0.0, 60), (1600.0, 0.0, 65)]);
        let mut lead = Segment::leading(2.0, point(1000.0, 0.0, 10));
        lead.is_cold_start = true;
        short.prepend(lead);
        short.labels.insert(TripLabel::ColdStart);

        let output = annotate_trips(&[TripItem::Observed(short)], &TripConfig::default());
        assert_eq!(output[0].code, TripCode::DistanceTooShort);
        assert!((output[0].distance() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_folded_single_point_is_distance_too_short() {
        let mut lone = trip(1.0, &[(0.0, 0.0, 0)]);
        lone.labels.insert(TripLabel::LtMinTripLength);
        assert_eq!(
            classify(&TripItem::Observed(lone), &TripConfig::default()),
            TripCode::DistanceTooShort
        );
    }
}
