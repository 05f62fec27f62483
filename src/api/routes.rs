//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_pending_handler, health_handler, invalidate_handler, proxy_handler, stats_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// The admin routes are only added when `state.admin_endpoints` is set.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/*path", get(proxy_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler));

    if state.admin_endpoints {
        router = router
            .route("/cache", delete(invalidate_handler))
            .route("/pending", delete(clear_pending_handler));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
