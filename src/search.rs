//! Shortest safe walking route over a handful of destination nudges.
//!
//! The provider is asked for a route to the destination itself and to the
//! destination shifted north, south, east and west. Routes that enter a
//! danger zone are dropped, and the shortest survivor wins. This is a cheap
//! bounded heuristic (at most five provider calls), so a detour that needs a
//! different path rather than a different endpoint will not be found.

use std::time::Duration;

use futures::future::join_all;

use crate::error::ProviderError;
use crate::geometry::{Point, Route};
use crate::provider::DynProvider;
use crate::safety::DangerZones;
use crate::shift::{Direction, SHIFT_OFFSET_DEG};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub shift_offset_deg: f64,
    /// Upper bound on each individual provider call.
    pub provider_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            shift_offset_deg: SHIFT_OFFSET_DEG,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

struct Candidate {
    route: Route,
    direction: Direction,
    distance_km: f64,
}

pub struct SafeRouteSearch {
    provider: DynProvider,
    settings: SearchSettings,
}

impl SafeRouteSearch {
    pub fn new(provider: DynProvider, settings: SearchSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Shortest route from `origin` to the destination or one of its shifts
    /// that stays clear of every danger zone. `None` when no candidate is
    /// both available and safe.
    ///
    /// All five provider calls run concurrently; the winner depends only on
    /// distance and candidate order, never on which call finished first.
    #[tracing::instrument(skip(self, zones), fields(provider = self.provider.name(), zones = zones.len()))]
    pub async fn find_best_safe_route(
        &self,
        origin: Point,
        destination: Point,
        zones: &DangerZones,
    ) -> Option<Route> {
        let offset = self.settings.shift_offset_deg;

        let requests = Direction::CANDIDATES.iter().map(|&direction| {
            let target = direction.target(destination, offset);
            async move { (direction, self.request(origin, target).await) }
        });

        // join_all keeps input order, so slot i always belongs to CANDIDATES[i].
        let responses = join_all(requests).await;

        let candidates: Vec<Candidate> = responses
            .into_iter()
            .filter_map(|(direction, result)| evaluate(direction, result, zones))
            .collect();

        match shortest(candidates) {
            Some(best) => {
                tracing::info!(
                    "Safe route chosen: {} {:.2} km",
                    best.direction,
                    best.distance_km
                );
                Some(best.route)
            }
            None => {
                tracing::warn!("No safe route found from any candidate destination");
                None
            }
        }
    }

    async fn request(&self, origin: Point, target: Point) -> Result<Route, ProviderError> {
        let limit = self.settings.provider_timeout;
        match tokio::time::timeout(limit, self.provider.walking_route(origin, target)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(limit)),
        }
    }
}

fn evaluate(
    direction: Direction,
    result: Result<Route, ProviderError>,
    zones: &DangerZones,
) -> Option<Candidate> {
    let route = match result {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!("No route for {} candidate: {}", direction, e);
            return None;
        }
    };

    if let Some(center) = zones.first_violation(&route) {
        tracing::debug!(
            "Discarding {} candidate: passes within {} km of [{}, {}]",
            direction,
            zones.radius_km(),
            center.x(),
            center.y()
        );
        return None;
    }

    let distance_km = route.length_km();
    tracing::debug!("Safe {} candidate: {:.3} km", direction, distance_km);

    Some(Candidate {
        route,
        direction,
        distance_km,
    })
}

/// `min_by` keeps the first of equal elements, so earlier directions win ties.
fn shortest(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates
        .into_iter()
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
}
