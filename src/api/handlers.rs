//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde_json::Value;
use tracing::info;

use super::proxy::{cache_key, proxy_segments};
use crate::config::Config;
use crate::error::{ApiError, Result, UpstreamError};
use crate::fetcher::CachedFetcher;
use crate::models::{
    ClearResponse, HealthResponse, InvalidateQuery, PendingClearedResponse, StatsResponse,
};
use crate::upstream::UpstreamClient;

/// Application state shared across all handlers.
///
/// The cached fetcher is created once here and cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: CachedFetcher<Value>,
    pub upstream: UpstreamClient,
    /// Whether the router mounts `DELETE /cache` and `DELETE /pending`
    pub admin_endpoints: bool,
}

impl AppState {
    /// Creates state with the admin routes disabled.
    pub fn new(fetcher: CachedFetcher<Value>, upstream: UpstreamClient) -> Self {
        Self {
            fetcher,
            upstream,
            admin_endpoints: false,
        }
    }

    pub fn with_admin_endpoints(mut self, enabled: bool) -> Self {
        self.admin_endpoints = enabled;
        self
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> std::result::Result<Self, UpstreamError> {
        Ok(Self::new(
            CachedFetcher::from_config(config),
            UpstreamClient::from_config(config)?,
        )
        .with_admin_endpoints(config.admin_endpoints))
    }
}

/// Handler for GET /api/*path
///
/// Serves the backend response through the cache, sharing one upstream
/// request between concurrent callers. Paths containing `.` or `..`
/// segments are rejected with 400 before anything is sent upstream.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let segments = proxy_segments(&path)?;
    let url = state.upstream.url_for(&segments, query.as_deref());

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let key = cache_key(&url, authorization.as_deref());

    let upstream = state.upstream.clone();
    let value = state
        .fetcher
        .with_cache_default(&key, move || async move {
            let body = upstream.get_json(url, authorization.as_deref()).await?;
            Ok::<Value, anyhow::Error>(body)
        })
        .await?;

    Ok(Json(value))
}

/// Handler for DELETE /cache
///
/// Drops one key (`?key=...`) or the whole cache.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<ClearResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let cleared = state.fetcher.cache().clear(query.key.as_deref());
    info!(key = ?query.key, cleared, "cache invalidated");

    Ok(Json(ClearResponse { cleared }))
}

/// Handler for DELETE /pending
///
/// Forgets in-flight registrations; running upstream requests still finish.
pub async fn clear_pending_handler(State(state): State<AppState>) -> Json<PendingClearedResponse> {
    let forgotten = state.fetcher.deduplicator().clear_pending_requests();
    info!(forgotten, "pending requests cleared");

    Json(PendingClearedResponse { forgotten })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.fetcher.cache().stats(),
        state.fetcher.deduplicator().stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
