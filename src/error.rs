use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Contract violations: these never happen when the search composes its own
/// pieces, so they are surfaced to the caller instead of being absorbed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

/// Why a routing provider produced no route for one candidate destination.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("underlying request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider found no route")]
    NoRoute,

    #[error("provider returned an invalid route: {0}")]
    InvalidRoute(#[from] Error),

    #[error("provider did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to read OSM extract: {0}")]
    Osm(#[from] osmpbf::Error),
}

/// Errors returned by the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Invalid(#[from] Error),

    #[error("no safe route found")]
    NoSafeRoute,

    #[error("{}", .0.body_text())]
    Body(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::NoSafeRoute => StatusCode::NOT_FOUND,
            ApiError::Body(rejection) => rejection.status(),
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
