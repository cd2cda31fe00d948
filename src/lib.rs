//! Shortest walking route that keeps clear of user-marked danger zones.

pub mod config;
pub mod error;
pub mod geometry;
pub mod provider;
pub mod safety;
pub mod search;
pub mod server;
pub mod shift;

pub use error::{ApiError, Error, ProviderError};
pub use geometry::{Point, Route};
pub use provider::{DynProvider, RoutingProvider};
pub use safety::{DANGER_ZONE_RADIUS_KM, DangerZones, is_route_safe};
pub use search::{SafeRouteSearch, SearchSettings};
pub use shift::{Compass, Direction, SHIFT_OFFSET_DEG, shift};
