//! Service layer: the upstream TMDB client, the CDN-backed object store
//! client, the append-only upload log, and the cache-aside orchestrator
//! composing the three.

pub mod cache_service;
pub mod store_client;
pub mod tmdb_client;
pub mod upload_log;
