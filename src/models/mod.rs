//! Data shapes for the metadata-caching proxy.
//!
//! Nothing here is persisted by this process: metadata records are built
//! per-request from TMDB responses and discarded once the response is sent,
//! and storage paths are pure string derivations that double as cache keys.

pub mod media;
pub mod paths;
