//! API Module
//!
//! HTTP handlers and routing for the caching gateway.
//!
//! # Endpoints
//! - `GET /api/*path` - Cached, deduplicated proxy to the REST backend
//! - `DELETE /cache` - Drop one cached key (`?key=`) or all of them
//! - `DELETE /pending` - Forget in-flight upstream requests
//! - `GET /stats` - Cache and deduplication statistics
//! - `GET /health` - Health check endpoint
//!
//! # Admin Endpoints
//! `DELETE /cache` and `DELETE /pending` carry no authentication. Anyone who
//! can reach them can flush the cache and force every caller back to the
//! backend. They are only mounted when `ADMIN_ENDPOINTS=true`; enable that on
//! deployments where the gateway port is reachable by operators only.

pub mod handlers;
pub mod proxy;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
