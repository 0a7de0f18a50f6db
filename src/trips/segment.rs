//! Projected points, segments and candidate trips.
//!
//! A `CandidateTrip` owns its segments outright; stages hand trips along by
//! value so that point edits (cold-start prepending, attach-point timestamp
//! rewrites) never alias across stages.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::geo_utils::planar_distance;
use crate::projection::UtmProjection;
use crate::{GeoCoord, RawFix};

/// A fix projected into the run's planar frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub h_accuracy: f64,
    pub speed: f64,
    pub timestamp: NaiveDateTime,
    pub easting: f64,
    pub northing: f64,
    /// Seconds since the preceding cleaned point (0 for the first point)
    pub period_before: i64,
    /// Planar meters from the preceding cleaned point (0 for the first point)
    pub distance_before: f64,
}

impl ProjectedPoint {
    pub fn from_fix(fix: &RawFix, projection: &UtmProjection) -> Self {
        let (easting, northing) = projection.project(&fix.coord());
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            h_accuracy: fix.h_accuracy,
            speed: fix.speed,
            timestamp: fix.timestamp,
            easting,
            northing,
            period_before: 0,
            distance_before: 0.0,
        }
    }

    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.latitude, self.longitude)
    }

    pub fn planar(&self) -> (f64, f64) {
        (self.easting, self.northing)
    }

    /// Planar distance to another point in meters.
    pub fn distance_to(&self, other: &ProjectedPoint) -> f64 {
        planar_distance(self.planar(), other.planar())
    }

    /// Whole seconds from this point until `later` (negative if `later` is earlier).
    pub fn seconds_until(&self, later: &ProjectedPoint) -> i64 {
        (later.timestamp - self.timestamp).num_seconds()
    }
}

/// How a segment was stitched onto the segment before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    #[default]
    None,
    Subway,
    Walking,
}

/// A contiguous run of points with no large internal time gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Monotonic group number; fractional for points folded in ahead of a segment
    pub group_id: f64,
    /// Never empty
    pub points: Vec<ProjectedPoint>,
    /// Gap in seconds before the segment's first point
    pub period_before: i64,
    /// Group id of the segment this one was stitched to
    pub link_to: Option<f64>,
    pub link_type: LinkType,
    pub is_cold_start: bool,
}

impl Segment {
    pub fn new(group_id: f64, points: Vec<ProjectedPoint>) -> Self {
        debug_assert!(!points.is_empty(), "segments are never empty");
        let period_before = points.first().map(|p| p.period_before).unwrap_or(0);
        Self {
            group_id,
            points,
            period_before,
            link_to: None,
            link_type: LinkType::None,
            is_cold_start: false,
        }
    }

    /// A one-point segment placed ahead of `group_id`.
    pub fn leading(group_id: f64, point: ProjectedPoint) -> Self {
        Self::new(group_id - 0.5, vec![point])
    }

    pub fn first(&self) -> &ProjectedPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &ProjectedPoint {
        &self.points[self.points.len() - 1]
    }

    /// Sum of point-to-point distances inside the segment.
    pub fn distance(&self) -> f64 {
        self.points.iter().skip(1).map(|p| p.distance_before).sum()
    }
}

/// Labels accumulated by a candidate trip on its way through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripLabel {
    SubwayLink,
    WalkingLink,
    /// A sub-minimum gap was folded onto the start of this trip
    LtMinTripLength,
    /// Lone point kept because it sits at a known location
    KnownLocationPing,
    /// Ping replaced by its flanking missing trips
    PingExpanded,
    ColdStart,
}

/// One or more segments treated as a single travel event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrip {
    /// Never empty
    pub segments: Vec<Segment>,
    pub labels: BTreeSet<TripLabel>,
}

impl CandidateTrip {
    pub fn new(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
            labels: BTreeSet::new(),
        }
    }

    pub fn first_segment(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn last_segment(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    pub fn start(&self) -> &ProjectedPoint {
        self.first_segment().first()
    }

    pub fn end(&self) -> &ProjectedPoint {
        self.last_segment().last()
    }

    /// Cumulative in-segment distance; jumps between segments are not counted.
    pub fn distance(&self) -> f64 {
        self.segments.iter().map(Segment::distance).sum()
    }

    pub fn duration_seconds(&self) -> i64 {
        self.start().seconds_until(self.end())
    }

    pub fn is_single_point(&self) -> bool {
        self.segments.len() == 1 && self.segments[0].points.len() == 1
    }

    pub fn has_label(&self, label: TripLabel) -> bool {
        self.labels.contains(&label)
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    pub fn points(&self) -> impl Iterator<Item = &ProjectedPoint> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }

    /// Stitch `other` onto the end of this trip.
    pub fn link(&mut self, other: CandidateTrip, link_type: LinkType) {
        let link_to = self.last_segment().group_id;
        let mut segments = other.segments.into_iter();
        if let Some(mut first) = segments.next() {
            first.link_to = Some(link_to);
            first.link_type = link_type;
            self.segments.push(first);
        }
        self.segments.extend(segments);
        self.labels.extend(other.labels);
        match link_type {
            LinkType::Subway => {
                self.labels.insert(TripLabel::SubwayLink);
            }
            LinkType::Walking => {
                self.labels.insert(TripLabel::WalkingLink);
            }
            LinkType::None => {}
        }
    }

    /// Insert a segment ahead of the current first segment.
    pub fn prepend(&mut self, segment: Segment) {
        self.segments.insert(0, segment);
    }

    /// Append a segment after the current last segment.
    pub fn append(&mut self, segment: Segment) {
        self.segments.push(segment);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    pub fn ts(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(minutes * 60)
    }

    /// A planar point; lat/lon are filler since stages only read the planar frame.
    pub fn point(easting: f64, northing: f64, minutes: i64) -> ProjectedPoint {
        ProjectedPoint {
            latitude: 45.5,
            longitude: -73.5,
            h_accuracy: 10.0,
            speed: 1.0,
            timestamp: ts(minutes),
            easting,
            northing,
            period_before: 0,
            distance_before: 0.0,
        }
    }

    /// A trip along the given (easting, northing, minute) stops, distances filled in.
    pub fn trip(group_id: f64, stops: &[(f64, f64, i64)]) -> CandidateTrip {
        let mut points: Vec<ProjectedPoint> = stops
            .iter()
            .map(|&(e, n, m)| point(e, n, m))
            .collect();
        for i in 1..points.len() {
            let d = points[i - 1].distance_to(&points[i]);
            let s = points[i - 1].seconds_until(&points[i]);
            points[i].distance_before = d;
            points[i].period_before = s;
        }
        CandidateTrip::new(Segment::new(group_id, points))
    }
}
