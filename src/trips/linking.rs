//! Stitch adjacent candidate trips whose gap is explained by travel.
//!
//! Subway linking runs first over the whole list; walking linking then runs
//! over its output, so a pair already joined underground is never looked at
//! again as a walking link.

use log::debug;

use crate::geo_utils::{implied_speed, kph_to_mps};
use crate::TripConfig;

use super::segment::{CandidateTrip, LinkType};
use super::subway::SubwayIndex;

/// Merge consecutive trips for which `should_link(current, next)` holds,
/// extending the merged trip with the following ones.
fn link_pass<F>(trips: Vec<CandidateTrip>, link_type: LinkType, should_link: F) -> Vec<CandidateTrip>
where
    F: Fn(&CandidateTrip, &CandidateTrip) -> bool,
{
    let mut linked: Vec<CandidateTrip> = Vec::with_capacity(trips.len());
    let mut links = 0usize;

    for next in trips {
        match linked.last_mut() {
            Some(current) if should_link(current, &next) => {
                current.link(next, link_type);
                links += 1;
            }
            _ => linked.push(next),
        }
    }

    if links > 0 {
        debug!("[TripDetection] Made {} {:?} links", links, link_type);
    }
    linked
}

/// Gap between two trips could be a subway ride: both ends sit at
/// different entrances, the gap is short enough, and the implied speed is
/// fast enough to rule out loitering around one station.
pub fn is_subway_gap(
    current: &CandidateTrip,
    next: &CandidateTrip,
    subway: &SubwayIndex,
    config: &TripConfig,
) -> bool {
    let (end, start) = (current.end(), next.start());
    let elapsed = end.seconds_until(start);
    if elapsed >= config.subway_max_gap_seconds {
        return false;
    }
    let fast_enough = implied_speed(end.distance_to(start), elapsed)
        .map(|speed| speed > kph_to_mps(config.subway_min_speed_kph))
        .unwrap_or(false);
    fast_enough && subway.near_distinct_entrances(end, start)
}

/// Link trips separated by underground travel between subway entrances.
pub fn link_subway_trips(
    trips: Vec<CandidateTrip>,
    subway: Option<&SubwayIndex>,
    config: &TripConfig,
) -> Vec<CandidateTrip> {
    match subway {
        Some(index) if !index.is_empty() => link_pass(trips, LinkType::Subway, |a, b| {
            is_subway_gap(a, b, index, config)
        }),
        _ => trips,
    }
}

/// Link trips whose straight-line speed across the gap shows the
/// participant kept moving faster than the walking-speed floor.
pub fn link_walking_trips(trips: Vec<CandidateTrip>, config: &TripConfig) -> Vec<CandidateTrip> {
    let floor = kph_to_mps(config.min_walking_speed_kph);
    link_pass(trips, LinkType::Walking, |a, b| {
        let (end, start) = (a.end(), b.start());
        implied_speed(end.distance_to(start), end.seconds_until(start))
            .map(|speed| speed > floor)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::segment::test_support::trip;
    use crate::trips::segment::TripLabel;

    #[test]
    fn test_walking_link_on_fast_gap() {
        // 5 km in 10 minutes = 30 km/h across the gap
        let trips = vec![
            trip(1.0, &[(0.0, 0.0, 0), (500.0, 0.0, 5)]),
            trip(2.0, &[(5500.0, 0.0, 15), (6000.0, 0.0, 20)]),
        ];
        let linked = link_walking_trips(trips, &TripConfig::default());
        assert_eq!(linked.len(), 1);
        assert!(linked[0].has_label(TripLabel::WalkingLink));
        assert_eq!(linked[0].segments[1].link_type, LinkType::Walking);
    }

    #[test]
    fn test_no_walking_link_on_slow_gap() {
        // 300 m in 30 minutes
        let trips = vec![
            trip(1.0, &[(0.0, 0.0, 0), (500.0, 0.0, 5)]),
            trip(2.0, &[(800.0, 0.0, 35), (1500.0, 0.0, 40)]),
        ];
        assert_eq!(link_walking_trips(trips, &TripConfig::default()).len(), 2);
    }

    #[test]
    fn test_chained_walking_links_extend_current() {
        let trips = vec![
            trip(1.0, &[(0.0, 0.0, 0), (500.0, 0.0, 5)]),
            trip(2.0, &[(5500.0, 0.0, 15), (6000.0, 0.0, 20)]),
            trip(3.0, &[(11000.0, 0.0, 30), (11500.0, 0.0, 35)]),
        ];
        let linked = link_walking_trips(trips, &TripConfig::default());
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].segments.len(), 3);
        assert_eq!(linked[0].segments[2].link_to, Some(2.0));
    }

    #[test]
    fn test_subway_skipped_without_index() {
        let trips = vec![
            trip(1.0, &[(0.0, 0.0, 0), (500.0, 0.0, 5)]),
            trip(2.0, &[(2500.0, 0.0, 20), (3000.0, 0.0, 25)]),
        ];
        assert_eq!(
            link_subway_trips(trips, None, &TripConfig::default()).len(),
            2
        );
    }
}
