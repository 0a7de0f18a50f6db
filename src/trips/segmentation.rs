//! Break the cleaned point stream into segments at large time gaps.

use super::segment::{CandidateTrip, ProjectedPoint, Segment};

/// Split points into segments wherever the gap to the previous point
/// exceeds `break_interval_seconds`.
///
/// Each point gets its `period_before`/`distance_before` relative to its
/// immediate predecessor (zero for the very first point). Group ids start
/// at 1 and increase by one per segment.
pub fn segment_points(points: Vec<ProjectedPoint>, break_interval_seconds: i64) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut current: Vec<ProjectedPoint> = Vec::new();
    let mut group_id = 1.0;

    for mut point in points {
        if let Some(prev) = current.last() {
            point.period_before = prev.seconds_until(&point);
            point.distance_before = prev.distance_to(&point);
        } else if let Some(prev) = segments.last().map(Segment::last) {
            point.period_before = prev.seconds_until(&point);
            point.distance_before = prev.distance_to(&point);
        } else {
            point.period_before = 0;
            point.distance_before = 0.0;
        }

        if !current.is_empty() && point.period_before > break_interval_seconds {
            segments.push(Segment::new(group_id, std::mem::take(&mut current)));
            group_id += 1.0;
        }
        current.push(point);
    }

    if !current.is_empty() {
        segments.push(Segment::new(group_id, current));
    }
    segments
}

/// Wrap each segment as its own candidate trip.
pub fn into_candidate_trips(segments: Vec<Segment>) -> Vec<CandidateTrip> {
    segments.into_iter().map(CandidateTrip::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::segment::test_support::point;

    #[test]
    fn test_splits_on_gap() {
        let points = vec![
            point(0.0, 0.0, 0),
            point(100.0, 0.0, 2),
            point(200.0, 0.0, 4),
            point(200.0, 300.0, 20),
            point(200.0, 400.0, 21),
        ];
        let segments = segment_points(points, 360);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].points.len(), 3);
        assert_eq!(segments[1].points.len(), 2);
        assert_eq!(segments[0].group_id, 1.0);
        assert_eq!(segments[1].group_id, 2.0);
        assert_eq!(segments[1].period_before, 16 * 60);
        assert!((segments[1].first().distance_before - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_point_has_zero_deltas() {
        let segments = segment_points(vec![point(5.0, 5.0, 0), point(5.0, 15.0, 1)], 360);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].first().period_before, 0);
        assert_eq!(segments[0].first().distance_before, 0.0);
        assert_eq!(segments[0].distance(), 10.0);
    }

    #[test]
    fn test_gap_equal_to_threshold_does_not_split() {
        let segments = segment_points(vec![point(0.0, 0.0, 0), point(0.0, 10.0, 6)], 360);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_union_of_segments_is_input() {
        // Every fifth point follows a 10 minute gap
        let mut minute = 0;
        let points: Vec<_> = (0..20)
            .map(|i| {
                minute += if i % 5 == 0 { 10 } else { 1 };
                point(i as f64 * 50.0, 0.0, minute)
            })
            .collect();
        let segments = segment_points(points.clone(), 360);
        assert_eq!(segments.len(), 4);
        let flattened: Vec<_> = segments.iter().flat_map(|s| s.points.iter()).collect();
        assert_eq!(flattened.len(), points.len());
        for (a, b) in flattened.iter().zip(points.iter()) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.easting, b.easting);
        }
    }
}
