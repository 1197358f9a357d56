//! Canonical storage keys for cached metadata and images.
//!
//! These derivations are the cache contract: the orchestrator decides
//! hit-or-miss by probing the metadata key on the CDN, so identical inputs
//! must always produce identical keys. The layout is stable:
//!
//! - `metadata/{type}_{id}.json`
//! - `images/poster/{type}_{id}.jpg`
//! - `images/backdrop/{type}_{id}.jpg`
//! - `metadata/episode_{id}_s{season}_e{episode}.json`
//! - `images/episode/episode_{id}_s{season}_e{episode}.jpg`

use super::media::MediaType;

/// Storage keys for one movie or TV show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TitlePaths {
    pub meta: String,
    pub poster: String,
    pub backdrop: String,
}

impl TitlePaths {
    pub fn new(media_type: MediaType, id: &str) -> Self {
        let kind = media_type.as_str();
        Self {
            meta: format!("metadata/{kind}_{id}.json"),
            poster: format!("images/poster/{kind}_{id}.jpg"),
            backdrop: format!("images/backdrop/{kind}_{id}.jpg"),
        }
    }
}

/// Storage keys for one TV episode. Season and episode are kept as the raw
/// query strings so the keys match whatever the caller originally asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpisodePaths {
    pub meta: String,
    pub still: String,
}

impl EpisodePaths {
    pub fn new(tv_id: &str, season: &str, episode: &str) -> Self {
        Self {
            meta: format!("metadata/episode_{tv_id}_s{season}_e{episode}.json"),
            still: format!("images/episode/episode_{tv_id}_s{season}_e{episode}.jpg"),
        }
    }
}
