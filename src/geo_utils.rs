//! Geographic and planar distance helpers.

use geo::{Coord, Distance, Euclidean, Haversine, LineString, Point};

use crate::GeoCoord;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(p1: &GeoCoord, p2: &GeoCoord) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Straight-line distance between two planar (easting, northing) positions.
pub fn planar_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    Euclidean::distance(Point::new(a.0, a.1), Point::new(b.0, b.1))
}

/// Planar line through (easting, northing) positions.
pub fn planar_line(points: &[(f64, f64)]) -> LineString<f64> {
    LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect())
}

/// Shortest planar distance from `p` to `line`.
pub fn planar_distance_to_line(p: (f64, f64), line: &LineString<f64>) -> f64 {
    Euclidean::distance(&Point::new(p.0, p.1), line)
}

/// Convert km/h to m/s.
pub fn kph_to_mps(kph: f64) -> f64 {
    kph / 3.6
}

/// Implied speed in m/s over `seconds`, or `None` when no time elapsed.
pub fn implied_speed(distance_m: f64, seconds: i64) -> Option<f64> {
    if seconds <= 0 {
        None
    } else {
        Some(distance_m / seconds as f64)
    }
}
