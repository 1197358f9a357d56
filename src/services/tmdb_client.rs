//! TMDB API client: metadata fetches and image downloads.
//!
//! Every call hits the network — caching lives entirely in the
//! orchestrator's CDN existence check. Transient failures are retried a
//! bounded number of times with a fixed delay; the final attempt's error is
//! the one propagated.

use crate::{
    errors::CacheError,
    models::media::{EpisodeMetadata, MediaType, TitleMetadata, TmdbEpisodeDoc, TmdbTitleDoc},
};
use bytes::Bytes;
use std::time::Duration;

/// Per-attempt network timeout. Bounds the latency of a stalled upstream;
/// there is no request-level timeout above this.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

/// Bounded retry for upstream calls: fixed delay, no backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Client for the TMDB REST API and its image CDN.
#[derive(Clone, Debug)]
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    image_base: String,
    retry: RetryPolicy,
}

impl TmdbClient {
    /// Build a client against the given API and image base URLs with the
    /// default retry policy.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        image_base: impl Into<String>,
    ) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(ATTEMPT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            api_base: api_base.into(),
            image_base: image_base.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch and normalize movie/TV metadata.
    pub async fn fetch_title(
        &self,
        id: &str,
        media_type: MediaType,
    ) -> Result<TitleMetadata, CacheError> {
        let url = format!(
            "{}/{}/{}?api_key={}&language=en-US",
            self.api_base,
            media_type.as_str(),
            id,
            self.api_key
        );
        let doc: TmdbTitleDoc = self
            .get_with_retry(&url)
            .await?
            .json()
            .await
            .map_err(|source| CacheError::Fetch {
                url: request_target(&url).to_string(),
                source,
            })?;
        Ok(doc.into())
    }

    /// Fetch and normalize a single episode of a TV show.
    pub async fn fetch_episode(
        &self,
        tv_id: &str,
        season: &str,
        episode: &str,
    ) -> Result<EpisodeMetadata, CacheError> {
        let url = format!(
            "{}/tv/{}/season/{}/episode/{}?api_key={}&language=en-US",
            self.api_base, tv_id, season, episode, self.api_key
        );
        let doc: TmdbEpisodeDoc = self
            .get_with_retry(&url)
            .await?
            .json()
            .await
            .map_err(|source| CacheError::Fetch {
                url: request_target(&url).to_string(),
                source,
            })?;
        Ok(doc.into())
    }

    /// Download the raw bytes of one image at the "original" rendition.
    ///
    /// A missing reference fails immediately with `MissingImagePath` and is
    /// never retried; actual download failures get the usual retry loop.
    pub async fn fetch_image(&self, reference: Option<&str>) -> Result<Bytes, CacheError> {
        let reference = reference.ok_or(CacheError::MissingImagePath)?;
        let url = format!("{}{}", self.image_base, reference);
        let response = self.get_with_retry(&url).await?;
        response.bytes().await.map_err(|source| CacheError::Fetch {
            url: request_target(&url).to_string(),
            source,
        })
    }

    /// GET `url`, retrying per the configured policy. Non-2xx statuses count
    /// as attempt failures. Earlier failures are logged as warnings; the
    /// last one is returned.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, CacheError> {
        let mut attempt = 1;
        loop {
            let failure = match self.http.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => CacheError::FetchStatus {
                    url: request_target(url).to_string(),
                    status: response.status(),
                },
                Err(source) => CacheError::Fetch {
                    url: request_target(url).to_string(),
                    source,
                },
            };

            if attempt >= self.retry.attempts {
                return Err(failure);
            }
            tracing::warn!(attempt, error = %failure, "TMDB request failed, retrying");
            attempt += 1;
            tokio::time::sleep(self.retry.delay).await;
        }
    }
}

/// Strip the query string before a URL lands in errors or logs; it embeds
/// the API key.
fn request_target(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
