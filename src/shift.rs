use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geometry::Point;

/// Default destination nudge, roughly 200 m of latitude. Unrelated to the
/// danger zone radius.
pub const SHIFT_OFFSET_DEG: f64 = 0.002;

/// A cardinal direction the shifter can move a point in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compass {
    North,
    South,
    East,
    West,
}

/// One candidate destination: the requested one, or a cardinal shift of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Original,
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Search order. Earlier entries win exact distance ties.
    pub const CANDIDATES: [Direction; 5] = [
        Direction::Original,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn compass(self) -> Option<Compass> {
        match self {
            Direction::Original => None,
            Direction::North => Some(Compass::North),
            Direction::South => Some(Compass::South),
            Direction::East => Some(Compass::East),
            Direction::West => Some(Compass::West),
        }
    }

    /// Destination to request a route to for this candidate.
    pub fn target(self, destination: Point, offset_deg: f64) -> Point {
        match self.compass() {
            Some(compass) => shift(destination, compass, offset_deg),
            None => destination,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Original => "original",
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" => Ok(Compass::North),
            "south" => Ok(Compass::South),
            "east" => Ok(Compass::East),
            "west" => Ok(Compass::West),
            other => Err(Error::invalid_input(format!(
                "unknown shift direction {:?}",
                other
            ))),
        }
    }
}

/// Move `point` by `offset_deg` degrees along one axis.
pub fn shift(point: Point, compass: Compass, offset_deg: f64) -> Point {
    let (lon, lat) = (point.x(), point.y());
    match compass {
        Compass::North => Point::new(lon, lat + offset_deg),
        Compass::South => Point::new(lon, lat - offset_deg),
        Compass::East => Point::new(lon + offset_deg, lat),
        Compass::West => Point::new(lon - offset_deg, lat),
    }
}
