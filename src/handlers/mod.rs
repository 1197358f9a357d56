//! HTTP handlers: the cache-aside metadata endpoints and health probes.

pub mod health_handlers;
pub mod metadata_handlers;
