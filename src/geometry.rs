use geo::{Coord, HaversineLength, LineString};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A location as (longitude, latitude) in decimal degrees.
pub type Point = geo::Point<f64>;

/// Build a point from a GeoJSON-ordered `[lon, lat]` pair.
pub fn point(lon_lat: [f64; 2]) -> Result<Point, Error> {
    let [lon, lat] = lon_lat;
    if !lon.is_finite() || !lat.is_finite() {
        return Err(Error::invalid_input(format!(
            "coordinate [{}, {}] is not finite",
            lon, lat
        )));
    }
    Ok(Point::new(lon, lat))
}

/// A walking polyline from origin to destination. Always holds at least two
/// vertices, in travel order.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    line: LineString<f64>,
}

impl Route {
    pub fn new(points: Vec<Point>) -> Result<Self, Error> {
        if points.len() < 2 {
            return Err(Error::invalid_input(format!(
                "a route needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|p| !p.x().is_finite() || !p.y().is_finite()) {
            return Err(Error::invalid_input(format!(
                "route vertex [{}, {}] is not finite",
                bad.x(),
                bad.y()
            )));
        }

        let coords: Vec<Coord<f64>> = points.into_iter().map(Coord::from).collect();
        Ok(Self {
            line: LineString::new(coords),
        })
    }

    pub fn from_lon_lat(coordinates: &[[f64; 2]]) -> Result<Self, Error> {
        Self::new(coordinates.iter().map(|&[lon, lat]| Point::new(lon, lat)).collect())
    }

    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.line.points()
    }

    pub fn origin(&self) -> Point {
        self.line.0[0].into()
    }

    pub fn destination(&self) -> Point {
        self.line.0[self.line.0.len() - 1].into()
    }

    /// Sum of the great-circle lengths of every segment.
    pub fn length_km(&self) -> f64 {
        self.line.haversine_length() / 1000.0
    }

    pub fn to_geojson(&self) -> GeoJsonLineString {
        GeoJsonLineString {
            r#type: "LineString".to_string(),
            coordinates: self.line.coords().map(|c| [c.x, c.y]).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoJsonLineString {
    pub r#type: String,
    pub coordinates: Vec<[f64; 2]>, // [lon, lat] standard for GeoJSON
}

impl TryFrom<GeoJsonLineString> for Route {
    type Error = Error;

    fn try_from(geometry: GeoJsonLineString) -> Result<Self, Self::Error> {
        if geometry.r#type != "LineString" {
            return Err(Error::invalid_input(format!(
                "expected a LineString geometry, got {}",
                geometry.r#type
            )));
        }
        Route::from_lon_lat(&geometry.coordinates)
    }
}

impl Serialize for Route {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_geojson().serialize(serializer)
    }
}
