use geo::{HaversineDestination, Intersects, LineString, Polygon};
use serde_json::{Value, json};

use crate::error::Error;
use crate::geometry::{Point, Route};

/// Radius around every danger point that a route must stay out of. Shared by
/// the route check and the highlight polygons.
pub const DANGER_ZONE_RADIUS_KM: f64 = 0.1;

/// Vertices per buffer polygon.
pub const BUFFER_STEPS: usize = 64;

/// A set of danger points, each expanded to a circular buffer.
#[derive(Debug, Clone)]
pub struct DangerZones {
    radius_km: f64,
    zones: Vec<(Point, Polygon<f64>)>,
}

impl DangerZones {
    pub fn new(centers: Vec<Point>, radius_km: f64) -> Result<Self, Error> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(Error::invalid_input(format!(
                "danger zone radius must be a positive distance, got {} km",
                radius_km
            )));
        }
        if let Some(bad) = centers.iter().find(|c| !c.x().is_finite() || !c.y().is_finite()) {
            return Err(Error::invalid_input(format!(
                "danger zone center [{}, {}] is not finite",
                bad.x(),
                bad.y()
            )));
        }

        let zones = centers
            .into_iter()
            .map(|center| (center, buffer(center, radius_km)))
            .collect();

        Ok(Self { radius_km, zones })
    }

    pub fn with_default_radius(centers: Vec<Point>) -> Result<Self, Error> {
        Self::new(centers, DANGER_ZONE_RADIUS_KM)
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// True when the route touches none of the buffers.
    pub fn permits(&self, route: &Route) -> bool {
        self.first_violation(route).is_none()
    }

    /// The first danger point whose buffer the route touches or crosses.
    pub fn first_violation(&self, route: &Route) -> Option<Point> {
        let line = route.line();
        self.zones
            .iter()
            .find(|(_, polygon)| line.intersects(polygon))
            .map(|(center, _)| *center)
    }

    /// GeoJSON FeatureCollection of the buffer polygons, for drawing the
    /// zones exactly as the check sees them.
    pub fn highlight(&self) -> Value {
        let features: Vec<Value> = self
            .zones
            .iter()
            .map(|(center, polygon)| {
                let ring: Vec<[f64; 2]> = polygon.exterior().coords().map(|c| [c.x, c.y]).collect();
                json!({
                    "type": "Feature",
                    "properties": {
                        "center": [center.x(), center.y()],
                        "radius_km": self.radius_km,
                    },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [ring],
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

/// Check a raw vertex list against danger points at the default radius.
///
/// Fails with `InvalidInput` for a route of fewer than two points instead of
/// answering either way.
pub fn is_route_safe(route: &[Point], danger_zones: &[Point]) -> Result<bool, Error> {
    let route = Route::new(route.to_vec())?;
    let zones = DangerZones::with_default_radius(danger_zones.to_vec())?;
    Ok(zones.permits(&route))
}

/// Polygon whose vertices all lie `radius_km` from `center` on the sphere.
pub fn buffer(center: Point, radius_km: f64) -> Polygon<f64> {
    let radius_m = radius_km * 1000.0;
    let ring: Vec<Point> = (0..BUFFER_STEPS)
        .map(|i| {
            let bearing = 360.0 * i as f64 / BUFFER_STEPS as f64;
            center.haversine_destination(bearing, radius_m)
        })
        .collect();

    Polygon::new(LineString::from(ring), vec![])
}

/// Great-circle distance from `center` to the farthest buffer vertex, in km.
#[cfg(test)]
pub(crate) fn buffer_reach_km(center: Point, polygon: &Polygon<f64>) -> f64 {
    polygon
        .exterior()
        .points()
        .map(|p| geo::HaversineDistance::haversine_distance(&center, &p))
        .fold(0.0, f64::max)
        / 1000.0
}
