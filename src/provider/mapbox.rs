use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::RoutingProvider;
use crate::error::ProviderError;
use crate::geometry::{GeoJsonLineString, Point, Route};

pub const DEFAULT_API_BASE: &str = "https://api.mapbox.com";

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    geometry: GeoJsonLineString,
}

/// Mapbox Directions v5, walking profile, GeoJSON geometries.
pub struct MapboxProvider {
    client: Client,
    access_token: String,
    base_url: String,
}

impl MapboxProvider {
    pub fn new(
        access_token: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn directions_url(&self, origin: Point, destination: Point) -> String {
        format!(
            "{}/directions/v5/mapbox/walking/{},{};{},{}",
            self.base_url,
            origin.x(),
            origin.y(),
            destination.x(),
            destination.y()
        )
    }
}

#[async_trait]
impl RoutingProvider for MapboxProvider {
    fn name(&self) -> &'static str {
        "mapbox"
    }

    async fn walking_route(
        &self,
        origin: Point,
        destination: Point,
    ) -> Result<Route, ProviderError> {
        let url = self.directions_url(origin, destination);
        tracing::debug!("[PROVIDER] Calling mapbox walking directions: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("geometries", "geojson")])
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await
            .map_err(redacted)?;

        let status = response.status();
        let text = response.text().await.map_err(redacted)?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_directions(&text)
    }
}

/// The request URL carries the access token in its query string.
fn redacted(e: reqwest::Error) -> ProviderError {
    ProviderError::Request(e.without_url())
}

/// First route of a directions response.
pub fn parse_directions(text: &str) -> Result<Route, ProviderError> {
    let response: DirectionsResponse = serde_json::from_str(text).map_err(|e| {
        tracing::error!("Failed to parse DirectionsResponse: {}. Body: {}", e, text);
        e
    })?;

    let first = response
        .routes
        .into_iter()
        .next()
        .ok_or(ProviderError::NoRoute)?;

    Ok(Route::try_from(first.geometry)?)
}
