//! Structured errors for the rewind-sw host.
//!
//! Every error renders as JSON with the stable code of the underlying
//! [`rewind_core::Error`].

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use rewind_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Worker(#[from] Error),

    /// Nothing exists at the requested admin resource.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// A bypassed request could not be forwarded to the origin.
    #[error("UPSTREAM_ERROR: {0}")]
    Upstream(String),
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ServerError::Worker(err) => {
                let status = match err {
                    Error::InvalidInput(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                    Error::InvalidState(_) => StatusCode::CONFLICT,
                    Error::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
                    e if e.is_network() => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": code, "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServerError::NotFound("notification 7".into()), StatusCode::NOT_FOUND),
            (ServerError::Upstream("connection refused".into()), StatusCode::BAD_GATEWAY),
            (Error::InvalidInput("empty tag".into()).into(), StatusCode::BAD_REQUEST),
            (Error::InvalidState("installing".into()).into(), StatusCode::CONFLICT),
            (Error::Network("offline".into()).into(), StatusCode::BAD_GATEWAY),
            (Error::MigrationFailed("1".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_worker_errors_keep_their_code() {
        let err: ServerError = Error::SyncFailed { tag: "sync-orders".into(), reason: "502".into() }.into();
        assert_eq!(err.status_and_code().1, "SYNC_FAILED");
        assert!(err.to_string().starts_with("SYNC_FAILED"));
    }
}
