//! Defines routes for the metadata caching proxy.
//!
//! ## Structure
//! - **Metadata endpoints**
//!   - `GET /api/getMetadata?id=&type=movie|tv[&season=&episode=]` — single item
//!   - `GET /api/getBatchMetadata?ids=a,b,c&type=movie|tv` — batch, ordered results
//!
//! - **Health endpoints**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — readiness (log-dir I/O + CDN reachability)

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        metadata_handlers::{get_batch_metadata, get_metadata},
    },
    services::cache_service::CacheService,
};
use axum::{Router, routing::get};

/// Build and return the router for all endpoints.
///
/// The router carries shared state (`CacheService`) to all handlers.
pub fn routes() -> Router<CacheService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // metadata endpoints
        .route("/api/getMetadata", get(get_metadata))
        .route("/api/getBatchMetadata", get(get_batch_metadata))
}
