//! Walking-route collaborators consumed by the safe route search.

pub mod graph;
pub mod mapbox;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::geometry::{Point, Route};

pub use graph::WalkGraph;
pub use mapbox::MapboxProvider;

/// Something that can produce a walking polyline between two points.
///
/// An `Err` means "no route for this pair"; callers decide whether that is
/// fatal.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn walking_route(&self, origin: Point, destination: Point)
    -> Result<Route, ProviderError>;
}

pub type DynProvider = Arc<dyn RoutingProvider>;
