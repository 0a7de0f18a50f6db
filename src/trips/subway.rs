//! Subway reference data and entrance proximity queries.

use geo::LineString;
use log::{debug, warn};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TripError};
use crate::geo_utils::{planar_distance_to_line, planar_line};
use crate::projection::UtmProjection;
use crate::GeoCoord;

use super::segment::ProjectedPoint;

/// Subway entrances and route polylines for a study region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubwayNetwork {
    pub entrances: Vec<GeoCoord>,
    /// Optional route centerlines; when present, entrances away from every
    /// route are ignored
    #[serde(default)]
    pub routes: Vec<Vec<GeoCoord>>,
}

impl SubwayNetwork {
    pub fn new(entrances: Vec<GeoCoord>) -> Self {
        Self {
            entrances,
            routes: Vec::new(),
        }
    }

    pub fn with_routes(mut self, routes: Vec<Vec<GeoCoord>>) -> Self {
        self.routes = routes;
        self
    }
}

/// A projected entrance with its index for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedEntrance {
    idx: usize,
    easting: f64,
    northing: f64,
}

impl RTreeObject for IndexedEntrance {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.easting, self.northing])
    }
}

impl PointDistance for IndexedEntrance {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let de = self.easting - point[0];
        let dn = self.northing - point[1];
        de * de + dn * dn
    }
}

/// Entrances projected into one run's planar frame.
#[derive(Debug)]
pub struct SubwayIndex {
    tree: RTree<IndexedEntrance>,
    buffer_meters: f64,
}

impl SubwayIndex {
    /// Project and index a network's entrances.
    ///
    /// Supplying a network with no entrances is an error: subway linking
    /// was requested without anything to link against.
    pub fn build(
        network: &SubwayNetwork,
        projection: &UtmProjection,
        buffer_meters: f64,
    ) -> Result<Self> {
        if network.entrances.is_empty() {
            return Err(TripError::MissingReferenceData {
                message: "subway network has no entrances".to_string(),
            });
        }

        // A LineString needs at least two points to have any extent
        let routes: Vec<LineString<f64>> = network
            .routes
            .iter()
            .filter(|route| route.len() >= 2)
            .map(|route| {
                let projected: Vec<(f64, f64)> =
                    route.iter().map(|c| projection.project(c)).collect();
                planar_line(&projected)
            })
            .collect();
        if routes.len() < network.routes.len() {
            warn!(
                "[TripDetection] Ignoring {} subway routes with fewer than 2 points",
                network.routes.len() - routes.len()
            );
        }

        let indexed: Vec<IndexedEntrance> = network
            .entrances
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                let (easting, northing) = projection.project(c);
                IndexedEntrance {
                    idx,
                    easting,
                    northing,
                }
            })
            .filter(|e| {
                routes.is_empty()
                    || routes.iter().any(|route| {
                        planar_distance_to_line((e.easting, e.northing), route) <= buffer_meters
                    })
            })
            .collect();

        let dropped = network.entrances.len() - indexed.len();
        if dropped > 0 {
            debug!(
                "[TripDetection] Ignoring {} subway entrances away from every route",
                dropped
            );
        }
        if indexed.is_empty() {
            warn!("[TripDetection] No subway entrance lies on a subway route");
        }

        Ok(Self {
            tree: RTree::bulk_load(indexed),
            buffer_meters,
        })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of entrances within the buffer of `point`, sorted.
    pub fn entrances_near(&self, point: &ProjectedPoint) -> Vec<usize> {
        let mut near: Vec<usize> = self
            .tree
            .locate_within_distance(
                [point.easting, point.northing],
                self.buffer_meters * self.buffer_meters,
            )
            .map(|e| e.idx)
            .collect();
        near.sort_unstable();
        near
    }

    /// Both points lie near some subway entrance, and not only the same one.
    pub fn near_distinct_entrances(&self, a: &ProjectedPoint, b: &ProjectedPoint) -> bool {
        let near_a = self.entrances_near(a);
        if near_a.is_empty() {
            return false;
        }
        let near_b = self.entrances_near(b);
        near_a.iter().any(|x| near_b.iter().any(|y| x != y))
    }
}
