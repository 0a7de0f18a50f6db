//! CSV readers for fixes and reference data.
//!
//! Fix files carry the columns `latitude,longitude,h_accuracy,speed,timestamp_UTC`.
//! Subway entrance and known-location files carry `label,latitude,longitude`;
//! entrances may omit the label column.

use std::io::Read;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::{Result, TripError};
use crate::{GeoCoord, KnownLocation, RawFix};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Deserialize)]
struct FixRow {
    latitude: f64,
    longitude: f64,
    h_accuracy: f64,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(rename = "timestamp_UTC")]
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct PlaceRow {
    #[serde(default)]
    label: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// Parse a UTC timestamp in ISO-8601 (`T` or space separated) form.
///
/// Fractional seconds are accepted and kept.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(value, fmt)
                .or_else(|_| NaiveDateTime::parse_from_str(value, &format!("{}%.f", fmt)))
                .ok()
        })
        .ok_or_else(|| TripError::Input {
            message: format!("Unrecognized timestamp '{}'", value),
        })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Read GPS fixes. Rows keep file order; ordering is checked by the pipeline.
pub fn read_fixes<R: Read>(reader: R) -> Result<Vec<RawFix>> {
    let mut rdr = csv_reader(reader);
    let mut fixes = Vec::new();
    for (line, row) in rdr.deserialize::<FixRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.timestamp).map_err(|err| TripError::Input {
            message: format!("row {}: {}", line + 1, err),
        })?;
        fixes.push(RawFix::new(
            row.latitude,
            row.longitude,
            row.h_accuracy,
            row.speed.unwrap_or(0.0),
            timestamp,
        ));
    }
    log::debug!("[Input] Read {} fixes", fixes.len());
    Ok(fixes)
}

/// Read subway entrance coordinates.
pub fn read_subway_entrances<R: Read>(reader: R) -> Result<Vec<GeoCoord>> {
    let mut rdr = csv_reader(reader);
    rdr.deserialize::<PlaceRow>()
        .map(|row| {
            let row = row?;
            Ok(GeoCoord::new(row.latitude, row.longitude))
        })
        .collect()
}

/// Read a participant's declared locations.
pub fn read_known_locations<R: Read>(reader: R) -> Result<Vec<KnownLocation>> {
    let mut rdr = csv_reader(reader);
    rdr.deserialize::<PlaceRow>()
        .map(|row| {
            let row = row?;
            let label = row.label.unwrap_or_default();
            Ok(KnownLocation::new(&label, row.latitude, row.longitude))
        })
        .collect()
}
