//! Case Room — API error types.

use axum::Json;
use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use caseroom_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Trace exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Votes held by the leading hypothesis, for consensus failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    /// Votes required, for consensus failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<usize>,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A domain rule rejected the request.
    Domain(DomainError),
    /// A webhook signature was missing or wrong.
    Unauthorized(&'static str),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Domain(DomainError::Validation(rejection.body_text()))
    }
}

/// JSON body extractor that reports unreadable bodies as `validation_error`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

fn status_of(err: &DomainError) -> StatusCode {
    match err {
        DomainError::RoomNotFound(_)
        | DomainError::ParticipantNotFound(_)
        | DomainError::HypothesisNotFound(_)
        | DomainError::EvidenceNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::NameTaken(_)
        | DomainError::InvalidTransition { .. }
        | DomainError::ConsensusNotReached { .. }
        | DomainError::NotAttached(_) => StatusCode::CONFLICT,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Domain(err) => {
                let (current, required) = match err {
                    DomainError::ConsensusNotReached { current, required } => {
                        (Some(current), Some(required))
                    }
                    _ => (None, None),
                };
                (
                    status_of(&err),
                    ErrorBody {
                        error: err.code(),
                        message: err.to_string(),
                        current,
                        required,
                    },
                )
            }
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "unauthorized",
                    message: message.to_owned(),
                    current: None,
                    required: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_for(err: DomainError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_lookup_failures_map_to_404() {
        assert_eq!(status_for(DomainError::RoomNotFound("CASE-XXXX".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(DomainError::ParticipantNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(DomainError::HypothesisNotFound("h9".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflicts_map_to_409() {
        assert_eq!(status_for(DomainError::NameTaken("Alice".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(DomainError::ConsensusNotReached {
                current: 2,
                required: 3,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(DomainError::NotAttached(Uuid::new_v4())), StatusCode::CONFLICT);
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        assert_eq!(status_for(DomainError::Forbidden("not lead".into())), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_for(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_for(DomainError::Infrastructure("no codes left".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = ApiError::Unauthorized("signature mismatch").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
