use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{ApiError, Error};
use crate::geometry::{GeoJsonLineString, Point, Route, point};
use crate::safety::DangerZones;
use crate::search::SafeRouteSearch;
use crate::shift::{Compass, shift};

// Shared State for concurrency
pub struct AppState {
    pub search: SafeRouteSearch,
    /// Zones used when a request does not bring its own.
    pub default_zones: DangerZones,
}

pub fn router(state: Arc<AppState>) -> Router {
    // Allows a local map page to talk to this API
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/route", post(find_route))
        .route("/route/check", post(check_route))
        .route("/danger-zones", get(danger_zones))
        .route("/shift", post(shift_point))
        .layer(cors)
        .with_state(state)
}

// --- API DTOs ---

/// JSON body whose rejections answer with the same `{"error": ...}` shape as
/// every other client error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Deserialize)]
pub struct RouteRequest {
    pub origin: [f64; 2],      // [lon, lat]
    pub destination: [f64; 2], // [lon, lat]
    #[serde(default)]
    pub danger_zones: Option<Vec<[f64; 2]>>,
}

#[derive(Serialize)]
pub struct RouteResponse {
    pub geometry: GeoJsonLineString,
    pub distance_km: f64,
}

#[derive(Deserialize)]
pub struct CheckRequest {
    pub route: Vec<[f64; 2]>,
    #[serde(default)]
    pub danger_zones: Option<Vec<[f64; 2]>>,
}

#[derive(Serialize)]
pub struct CheckResponse {
    pub safe: bool,
    /// Center of the first zone the route enters.
    pub violation: Option<[f64; 2]>,
}

#[derive(Deserialize)]
pub struct ShiftRequest {
    pub point: [f64; 2],
    pub direction: String,
    pub offset: Option<f64>,
}

#[derive(Serialize)]
pub struct ShiftResponse {
    pub point: [f64; 2],
}

// --- Handlers ---

fn zones_for(state: &AppState, requested: Option<Vec<[f64; 2]>>) -> Result<DangerZones, Error> {
    match requested {
        None => Ok(state.default_zones.clone()),
        Some(raw) => {
            let centers = raw.into_iter().map(point).collect::<Result<Vec<Point>, _>>()?;
            DangerZones::new(centers, state.default_zones.radius_km())
        }
    }
}

async fn find_route(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let origin = point(payload.origin)?;
    let destination = point(payload.destination)?;
    let zones = zones_for(&state, payload.danger_zones)?;

    let route = state
        .search
        .find_best_safe_route(origin, destination, &zones)
        .await
        .ok_or(ApiError::NoSafeRoute)?;

    Ok(Json(RouteResponse {
        distance_km: route.length_km(),
        geometry: route.to_geojson(),
    }))
}

async fn check_route(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let route = Route::from_lon_lat(&payload.route)?;
    let zones = zones_for(&state, payload.danger_zones)?;
    let violation = zones.first_violation(&route);

    Ok(Json(CheckResponse {
        safe: violation.is_none(),
        violation: violation.map(|p| [p.x(), p.y()]),
    }))
}

async fn danger_zones(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.default_zones.highlight())
}

async fn shift_point(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ShiftRequest>,
) -> Result<Json<ShiftResponse>, ApiError> {
    let compass: Compass = payload.direction.parse()?;
    let offset = payload
        .offset
        .unwrap_or(state.search.settings().shift_offset_deg);
    if !offset.is_finite() {
        return Err(Error::invalid_input("offset must be finite").into());
    }

    let shifted = shift(point(payload.point)?, compass, offset);
    Ok(Json(ShiftResponse {
        point: [shifted.x(), shifted.y()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::RoutingProvider;
    use crate::safety::buffer_reach_km;
    use crate::search::SearchSettings;
    use assert_approx_eq::assert_approx_eq;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Walks in a straight line to wherever it is asked.
    struct StraightLine;

    #[async_trait]
    impl RoutingProvider for StraightLine {
        fn name(&self) -> &'static str {
            "straight-line"
        }

        async fn walking_route(
            &self,
            origin: Point,
            destination: Point,
        ) -> Result<Route, ProviderError> {
            Ok(Route::new(vec![origin, destination])?)
        }
    }

    fn app() -> Router {
        let state = AppState {
            search: SafeRouteSearch::new(Arc::new(StraightLine), SearchSettings::default()),
            default_zones: DangerZones::with_default_radius(vec![Point::new(-73.9851, 40.7589)])
                .unwrap(),
        };
        router(Arc::new(state))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn returns_the_shortest_safe_candidate() {
        // Everything is safe, so the southern nudge towards the origin wins.
        let body = serde_json::json!({
            "origin": [10.0, 45.0],
            "destination": [10.0, 45.01],
            "danger_zones": [[10.01, 45.005]]
        });
        let (status, json) = send(app(), "POST", "/route", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["geometry"]["type"], "LineString");
        let end_lat = json["geometry"]["coordinates"][1][1].as_f64().unwrap();
        assert_approx_eq!(end_lat, 45.008, 1e-9);
        assert_approx_eq!(json["distance_km"].as_f64().unwrap(), 0.8896, 1e-3);
    }

    #[tokio::test]
    async fn request_without_zones_uses_the_defaults() {
        // Straight through the default Times Square zone, and so are all the nudges.
        let body = serde_json::json!({
            "origin": [-73.9851, 40.7489],
            "destination": [-73.9851, 40.7689]
        });
        let (status, _) = send(app(), "POST", "/route", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blocked_corridor_is_not_found() {
        // Every candidate line passes within ~80 m of the zone.
        let body = serde_json::json!({
            "origin": [10.0, 45.0],
            "destination": [10.0, 45.01],
            "danger_zones": [[10.0, 45.005]]
        });
        let (status, json) = send(app(), "POST", "/route", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "no safe route found");
    }

    #[tokio::test]
    async fn check_reports_the_offending_zone() {
        let body = serde_json::json!({
            "route": [[-73.99, 40.7589], [-73.98, 40.7589]]
        });
        let (status, json) = send(app(), "POST", "/route/check", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["safe"], false);
        assert_eq!(json["violation"][0], -73.9851);
    }

    #[tokio::test]
    async fn check_rejects_single_point_routes() {
        let body = serde_json::json!({ "route": [[-73.99, 40.7589]], "danger_zones": [] });
        let (status, json) = send(app(), "POST", "/route/check", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("invalid input"));
    }

    #[tokio::test]
    async fn danger_zone_polygons_use_the_check_radius() {
        let request = Request::builder()
            .uri("/danger-zones")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        let feature = &json["features"][0];
        let ring: Vec<[f64; 2]> =
            serde_json::from_value(feature["geometry"]["coordinates"][0].clone()).unwrap();
        let polygon = geo::Polygon::new(geo::LineString::from(ring), vec![]);
        let center = Point::new(-73.9851, 40.7589);
        assert_approx_eq!(buffer_reach_km(center, &polygon), 0.1, 1e-6);
    }

    #[tokio::test]
    async fn malformed_bodies_answer_with_json_errors() {
        let body = serde_json::json!({ "origin": [10.0, 45.0] });
        let (status, json) = send(app(), "POST", "/route", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("destination"));

        let body = serde_json::json!({ "route": "not a list" });
        let (status, json) = send(app(), "POST", "/route/check", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/shift")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn shift_endpoint() {
        let body = serde_json::json!({ "point": [1.0, 2.0], "direction": "west" });
        let (status, json) = send(app(), "POST", "/shift", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["point"][0], 1.0 - 0.002);
        assert_eq!(json["point"][1], 2.0);

        let body = serde_json::json!({ "point": [1.0, 2.0], "direction": "up" });
        let (status, _) = send(app(), "POST", "/shift", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
