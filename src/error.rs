//! Error types for the cache, the deduplicator and the gateway
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Error ==
/// Outcome of a failed shared fetch.
///
/// Cloned to every caller that joined the same in-flight operation, so all
/// of them observe the identical failure.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The fetcher returned an error
    #[error("fetch failed: {0:#}")]
    Failed(Arc<anyhow::Error>),

    /// The operation was cancelled before it settled
    #[error("fetch cancelled: {0}")]
    Cancelled(String),

    /// The fetcher panicked
    #[error("fetch panicked: {0}")]
    Panicked(String),
}

impl FetchError {
    pub fn failed(err: anyhow::Error) -> Self {
        FetchError::Failed(Arc::new(err))
    }

    /// Returns the fetcher's error when it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            FetchError::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

// == Upstream Error ==
/// Failure talking to the REST backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The backend answered with a non-success status
    #[error("upstream returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The request could not be sent or its body could not be decoded
    #[error("upstream unreachable: {0}")]
    Transport(String),

    /// The configured base URL cannot have paths appended to it
    #[error("invalid upstream base url: {0}")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Transport(err.to_string())
    }
}

// == API Error ==
/// Errors surfaced by the gateway's HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Non-success status passed through from the backend
    #[error("{detail}")]
    Upstream { status: StatusCode, detail: String },

    /// Backend could not be reached
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// The shared fetch was cancelled
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        if let Some(upstream) = err.downcast_ref::<UpstreamError>() {
            return match upstream {
                UpstreamError::Status { status, detail } => ApiError::Upstream {
                    status: StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                    detail: detail.clone(),
                },
                UpstreamError::Transport(msg) => ApiError::BadGateway(msg.clone()),
                UpstreamError::InvalidBaseUrl(msg) => ApiError::Internal(msg.clone()),
            };
        }
        match err {
            FetchError::Failed(inner) => ApiError::Internal(format!("{inner:#}")),
            FetchError::Cancelled(msg) => ApiError::Unavailable(msg),
            FetchError::Panicked(msg) => ApiError::Internal(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { status, .. } => *status,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the gateway handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_fetch_error_clones_share_source() {
        let err = FetchError::failed(anyhow::anyhow!("boom"));
        let clone = err.clone();

        match (&err, &clone) {
            (FetchError::Failed(a), FetchError::Failed(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected Failed"),
        }
        assert_eq!(clone.to_string(), "fetch failed: boom");
    }

    #[test]
    fn test_downcast_upstream_status() {
        let err = FetchError::failed(
            UpstreamError::Status {
                status: 404,
                detail: "Student not found".to_string(),
            }
            .into(),
        );

        let api: ApiError = err.into();
        match api {
            ApiError::Upstream { status, detail } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(detail, "Student not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (
                ApiError::from(FetchError::failed(
                    UpstreamError::Transport("refused".to_string()).into(),
                )),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(FetchError::Cancelled("k".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(FetchError::Panicked("oops".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(FetchError::failed(anyhow::anyhow!("other"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.into_response().status(), expected_status);
        }
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let response = ApiError::InvalidRequest("key must not be empty".to_string()).into_response();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"], "Invalid request: key must not be empty");
    }
}
