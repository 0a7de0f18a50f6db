//! Complete-day accounting over hand-built trip timelines.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use trip_inference::complete_days::summarize_complete_days_tz;
use trip_inference::{
    summarize_complete_days, CompleteDaysConfig, DayStatus, DaySummary, Trip, TripCode, TripPoint,
};

const LON: f64 = -73.5700;

/// Noon in Montreal on the given day of May 2023.
fn noon(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 5, day)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap()
}

fn point(lat: f64, timestamp: NaiveDateTime) -> TripPoint {
    TripPoint {
        latitude: lat,
        longitude: LON,
        h_accuracy: 10.0,
        timestamp,
        distance_before: 0.0,
        trip_distance: 0.0,
        duration_before: 0,
    }
}

fn trip(num: u32, code: TripCode, start: NaiveDateTime, lats: &[f64]) -> Trip {
    Trip {
        num,
        code,
        points: lats
            .iter()
            .enumerate()
            .map(|(i, &lat)| point(lat, start + Duration::minutes(5 * i as i64)))
            .collect(),
    }
}

fn summarize(trips: &[Trip]) -> Vec<DaySummary> {
    summarize_complete_days(trips, "America/Montreal", &CompleteDaysConfig::default()).unwrap()
}

/// Complete days on May 1 and May 4 with nothing in between. Day 4's trip
/// starts far away, but its second point is `second_lat`.
fn bracketed_gap(second_lat: f64) -> Vec<Trip> {
    vec![
        trip(1, TripCode::CompleteTrip, noon(1), &[45.4900, 45.4950, 45.5000]),
        trip(2, TripCode::CompleteTrip, noon(4), &[45.5500, second_lat, 45.5600]),
    ]
}

#[test]
fn test_nearby_inactive_days_are_explained() {
    // About 300 m from day 1's last point
    let days = summarize(&bracketed_gap(45.5027));

    assert_eq!(days.len(), 4);
    let statuses: Vec<DayStatus> = days.iter().map(|d| d.status).collect();
    assert_eq!(
        statuses,
        vec![
            DayStatus::Complete,
            DayStatus::NoData,
            DayStatus::NoData,
            DayStatus::Complete
        ]
    );
    assert!(days.iter().all(|d| d.is_complete));
    assert!(!days[1].has_trips);
    assert_eq!(days[1].inactivity_streak, Some(2));
    assert!(days[1].before_is_complete);
    assert!(days[2].after_is_complete);
}

#[test]
fn test_distant_inactive_days_stay_incomplete() {
    // About 2 km from day 1's last point
    let days = summarize(&bracketed_gap(45.5180));

    assert_eq!(days.len(), 4);
    assert!(days[0].is_complete);
    assert!(!days[1].is_complete);
    assert!(!days[2].is_complete);
    assert_eq!(days[1].status, DayStatus::NoData);
    assert!(days[3].is_complete);
}

#[test]
fn test_run_between_incomplete_day_not_explained() {
    let trips = vec![
        trip(1, TripCode::CompleteTrip, noon(1), &[45.4900, 45.5000]),
        trip(2, TripCode::MissingTrip, noon(4), &[45.5000, 45.5001]),
    ];
    let days = summarize(&trips);
    assert_eq!(days[3].status, DayStatus::Incomplete);
    assert!(!days[1].is_complete);
    assert!(!days[2].is_complete);
}

#[test]
fn test_every_date_in_range_present() {
    let trips = vec![
        trip(1, TripCode::CompleteTrip, noon(1), &[45.50, 45.51]),
        trip(2, TripCode::CompleteTrip, noon(9), &[45.60, 45.61]),
    ];
    let days = summarize(&trips);

    assert_eq!(days.len(), 9);
    for pair in days.windows(2) {
        assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
    }
    let inactive: Vec<Option<u32>> = days.iter().map(|d| d.consecutive_inactive_days).collect();
    assert_eq!(
        inactive,
        vec![
            None,
            Some(1),
            Some(2),
            Some(3),
            Some(4),
            Some(5),
            Some(6),
            Some(7),
            None
        ]
    );
    assert!(days[1..8].iter().all(|d| d.inactivity_streak == Some(7)));
    assert!(days[1..8].iter().all(|d| !d.is_complete));
}

#[test]
fn test_day_points_and_missing_trips() {
    let trips = vec![
        trip(1, TripCode::CompleteTrip, noon(2), &[45.50, 45.51]),
        trip(2, TripCode::MissingTripTooShort, noon(2) + Duration::hours(2), &[45.51, 45.512]),
        trip(3, TripCode::CompleteTrip, noon(2) + Duration::hours(3), &[45.512, 45.53]),
    ];
    let days = summarize(&trips);

    assert_eq!(days.len(), 1);
    let day = &days[0];
    assert_eq!(day.status, DayStatus::Incomplete);
    assert!(day.has_trips);
    assert!(!day.is_complete);
    assert_eq!(day.start_point.as_ref().map(|p| p.latitude), Some(45.50));
    assert_eq!(day.end_point.as_ref().map(|p| p.latitude), Some(45.53));
    assert_eq!(day.consecutive_inactive_days, None);
}

#[test]
fn test_late_evening_trip_counts_on_local_date() {
    // 23:30 local on May 3 is 03:30 UTC on May 4
    let start = NaiveDate::from_ymd_opt(2023, 5, 4)
        .unwrap()
        .and_hms_opt(3, 30, 0)
        .unwrap();
    let trips = vec![trip(1, TripCode::CompleteTrip, start, &[45.50, 45.51])];

    let local = summarize(&trips);
    assert_eq!(local[0].date, NaiveDate::from_ymd_opt(2023, 5, 3).unwrap());

    let utc = summarize_complete_days_tz(&trips, chrono_tz::UTC, &CompleteDaysConfig::default());
    assert_eq!(utc[0].date, NaiveDate::from_ymd_opt(2023, 5, 4).unwrap());
    assert_eq!(utc[0].timezone, "UTC");
}

#[test]
fn test_config_widens_explained_run() {
    let trips = vec![
        trip(1, TripCode::CompleteTrip, noon(1), &[45.4900, 45.5000]),
        trip(2, TripCode::CompleteTrip, noon(5), &[45.5500, 45.5005, 45.5600]),
    ];
    assert!(!summarize(&trips)[2].is_complete);

    let config = CompleteDaysConfig {
        max_explained_inactive_days: 3,
        ..CompleteDaysConfig::default()
    };
    let days = summarize_complete_days(&trips, "America/Montreal", &config).unwrap();
    assert!(days.iter().all(|d| d.is_complete));
}
