//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hubbridge_domain::error::{BridgeError, CommandError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`BridgeError`] to an HTTP response with appropriate status code.
pub struct ApiError(BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BridgeError::Command(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            BridgeError::Command(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            BridgeError::SessionUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            BridgeError::Transport(err) => {
                tracing::error!(error = %err, "transport error");
                (StatusCode::BAD_GATEWAY, "hub transport error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
