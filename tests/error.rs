//! Fatal conditions surfaced through the public API.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use trip_inference::{
    detect_trips, summarize_complete_days, CompleteDaysConfig, RawFix, ReferenceData,
    SubwayNetwork, TripCode, TripConfig, TripError,
};

fn t(minutes: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        + Duration::minutes(minutes)
}

fn fixes() -> Vec<RawFix> {
    (0..6)
        .map(|i| RawFix::new(45.5 + i as f64 * 0.0005, -73.57, 10.0, 1.0, t(i)))
        .collect()
}

#[test]
fn test_backwards_timestamp_aborts_run() {
    let mut input = fixes();
    input[4].timestamp = t(1);

    let err = detect_trips(&input, &ReferenceData::default(), &TripConfig::default()).unwrap_err();
    assert_eq!(
        err,
        TripError::NonMonotonicTimestamps {
            index: 4,
            previous: t(3),
            current: t(1),
        }
    );
}

#[test]
fn test_invalid_coordinates_abort_run() {
    let mut input = fixes();
    input[2].latitude = f64::NAN;

    let err = detect_trips(&input, &ReferenceData::default(), &TripConfig::default()).unwrap_err();
    assert!(matches!(err, TripError::InvalidCoordinates { index: 2, .. }));

    let mut input = fixes();
    input[0].longitude = 200.0;
    assert!(detect_trips(&input, &ReferenceData::default(), &TripConfig::default()).is_err());
}

#[test]
fn test_empty_subway_network_is_missing_reference_data() {
    let reference = ReferenceData {
        subway: Some(SubwayNetwork::new(Vec::new())),
        known_locations: Vec::new(),
    };
    let err = detect_trips(&fixes(), &reference, &TripConfig::default()).unwrap_err();
    assert!(matches!(err, TripError::MissingReferenceData { .. }));
}

#[test]
fn test_invalid_config_rejected() {
    let config = TripConfig {
        min_trip_length_meters: -1.0,
        ..TripConfig::default()
    };
    let err = detect_trips(&fixes(), &ReferenceData::default(), &config).unwrap_err();
    assert!(err.to_string().contains("min_trip_length_meters"));
}

#[test]
fn test_unknown_timezone() {
    let err = summarize_complete_days(&[], "Atlantis/Capital", &CompleteDaysConfig::default())
        .unwrap_err();
    assert_eq!(
        err,
        TripError::UnknownTimezone {
            name: "Atlantis/Capital".to_string()
        }
    );
}

#[test]
fn test_unknown_trip_code() {
    assert_eq!(
        TripCode::try_from(150),
        Err(TripError::UnknownTripCode { code: 150 })
    );
    assert!(serde_json::from_str::<TripCode>("999").is_err());
}
