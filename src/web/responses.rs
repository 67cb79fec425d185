//! HTTP response mapping for analysis errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::AnalysisError;
use crate::models::ErrorBody;

impl AnalysisError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidReference { .. } => StatusCode::BAD_REQUEST,
            Self::FetchTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            // upstream HTTP failures are proxied through as-is
            Self::UpstreamStatus { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::PayloadTooLarge { .. } => StatusCode::BAD_REQUEST,
            Self::MalformedDocument { .. } => StatusCode::BAD_REQUEST,
            Self::CueDecodingUnsupported | Self::ProbeFailure { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            // internal failure text goes into details, never the message
            Self::Internal { message } => ErrorBody {
                error: self.kind().to_string(),
                message: "Failed to parse manifest".to_string(),
                details: Some(message.clone()),
            },
            other => ErrorBody {
                error: other.kind().to_string(),
                message: other.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

/// 422 for request bodies that fail validation before any business
/// rule runs, keeping them distinct from the 400s the gate produces.
pub fn validation_error(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody {
            error: "validation_error".to_string(),
            message: message.to_string(),
            details: None,
        }),
    )
        .into_response()
}
