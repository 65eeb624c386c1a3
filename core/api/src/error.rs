//! HTTP rendering of the vault error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use credvault_common::Error;

/// Wrapper giving the common error an HTTP shape.
///
/// The rendered body carries only the sanitized `Display` message;
/// internal detail stays in the operational log.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// Map an error variant to its response status.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) | Error::VersionConflict { .. } => StatusCode::CONFLICT,
        Error::Integrity(_)
        | Error::KeyUnavailable(_)
        | Error::Persistence(_)
        | Error::Crypto(_)
        | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        }));
        (status, body).into_response()
    }
}
