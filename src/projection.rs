//! Universal Transverse Mercator projection on the WGS84 ellipsoid.
//!
//! A run picks one zone (from its first fix) and projects every point it
//! compares with that zone, so distances stay consistent within the run
//! even when a user wanders across a zone boundary.
//!
//! Forward projection uses the Krüger series to third order in `n`,
//! accurate to well under a meter within a zone.

use crate::error::{Result, TripError};
use crate::GeoCoord;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A fixed UTM zone used to project coordinates to (easting, northing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmProjection {
    zone: u8,
    south: bool,
    central_meridian: f64,
}

impl UtmProjection {
    /// Projection for an explicit zone (1-60) and hemisphere.
    pub fn new(zone: u8, south: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(TripError::Config {
                message: format!("UTM zone {} out of range 1-60", zone),
            });
        }
        Ok(Self {
            zone,
            south,
            central_meridian: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
        })
    }

    /// Projection for the zone containing `coord`.
    pub fn for_coord(coord: &GeoCoord) -> Self {
        let zone = (((coord.longitude + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u8;
        let south = coord.latitude < 0.0;
        Self {
            zone,
            south,
            central_meridian: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
        }
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn is_south(&self) -> bool {
        self.south
    }

    /// Project a coordinate to (easting, northing) in meters.
    pub fn project(&self, coord: &GeoCoord) -> (f64, f64) {
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;
        let big_a = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);
        let alpha = [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3,
            61.0 / 240.0 * n3,
        ];

        let phi = coord.latitude.to_radians();
        let dlambda = (coord.longitude - self.central_meridian).to_radians();

        let two_sqrt_n = 2.0 * n.sqrt() / (1.0 + n);
        let sin_phi = phi.sin();
        let t = (sin_phi.atanh() - two_sqrt_n * (two_sqrt_n * sin_phi).atanh()).sinh();
        let xi = t.atan2(dlambda.cos());
        let eta = (dlambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut easting_sum = eta;
        let mut northing_sum = xi;
        for (j, a) in alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            easting_sum += a * (k * xi).cos() * (k * eta).sinh();
            northing_sum += a * (k * xi).sin() * (k * eta).cosh();
        }

        let easting = FALSE_EASTING + K0 * big_a * easting_sum;
        let mut northing = K0 * big_a * northing_sum;
        if self.south {
            northing += FALSE_NORTHING_SOUTH;
        }
        (easting, northing)
    }
}
