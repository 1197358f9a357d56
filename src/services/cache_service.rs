//! Cache-aside orchestration.
//!
//! Per request: derive the canonical storage paths, probe the CDN for the
//! metadata key, and either return cache-sourced URLs (hit) or fetch from
//! TMDB, populate the store, log the event, and return the fresh metadata
//! alongside the same URLs (miss).
//!
//! All state is request-scoped. Two concurrent requests for the same id can
//! both miss and both populate the store; the redundant work is accepted,
//! the result is identical either way.

use crate::{
    errors::CacheError,
    models::{
        media::{EpisodeMetadata, MediaType, TitleMetadata},
        paths::{EpisodePaths, TitlePaths},
    },
    services::{store_client::StoreClient, tmdb_client::TmdbClient, upload_log::UploadLog},
};
use futures::{StreamExt, stream};
use serde::Serialize;

/// Where a response was served from.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cdn,
    Tmdb,
}

/// Outcome of the single-title flow.
///
/// URLs are always computed from the storage layout; an image URL is `None`
/// only when this request tried to mirror that image and could not (or the
/// metadata carried no reference), in which case nothing is at that key.
/// `metadata` is present only on a miss — hits return URLs alone.
#[derive(Clone, Debug)]
pub struct TitleResult {
    pub from: Source,
    pub meta_url: String,
    pub image_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub metadata: Option<TitleMetadata>,
}

/// Outcome of the episode flow. Episodes have a single still image and no
/// backdrop.
#[derive(Clone, Debug)]
pub struct EpisodeResult {
    pub from: Source,
    pub meta_url: String,
    pub image_url: Option<String>,
    pub metadata: Option<EpisodeMetadata>,
}

/// One entry of a batch run, keyed back to the id that produced it.
#[derive(Debug)]
pub struct BatchItem {
    pub id: String,
    pub outcome: Result<TitleResult, CacheError>,
}

/// The request orchestrator. Cheap to clone; shared as axum router state.
#[derive(Clone, Debug)]
pub struct CacheService {
    tmdb: TmdbClient,
    store: StoreClient,
    upload_log: UploadLog,
    batch_concurrency: usize,
}

impl CacheService {
    pub fn new(
        tmdb: TmdbClient,
        store: StoreClient,
        upload_log: UploadLog,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            tmdb,
            store,
            upload_log,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    pub fn upload_log(&self) -> &UploadLog {
        &self.upload_log
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// Cache-aside flow for one movie or TV show.
    pub async fn get_title(
        &self,
        id: &str,
        media_type: MediaType,
    ) -> Result<TitleResult, CacheError> {
        let paths = TitlePaths::new(media_type, id);
        let meta_url = self.store.cdn_url(&paths.meta);
        let poster_url = self.store.cdn_url(&paths.poster);
        let backdrop_url = self.store.cdn_url(&paths.backdrop);

        // Only the metadata key is probed; image keys are never checked
        // independently.
        if self.store.exists(&paths.meta).await {
            tracing::info!(id, media_type = media_type.as_str(), "serving from CDN cache");
            return Ok(TitleResult {
                from: Source::Cdn,
                meta_url,
                image_url: Some(poster_url),
                backdrop_url: Some(backdrop_url),
                metadata: None,
            });
        }

        // Miss: metadata fetch and upload are fatal, images degrade.
        let metadata = self.tmdb.fetch_title(id, media_type).await?;
        let body = serde_json::to_vec_pretty(&metadata)?;
        self.store.upload(&paths.meta, body.into()).await?;

        let poster_ok = self
            .mirror_image(id, metadata.poster_path.as_deref(), &paths.poster, "poster")
            .await;
        let backdrop_ok = self
            .mirror_image(
                id,
                metadata.backdrop_path.as_deref(),
                &paths.backdrop,
                "backdrop",
            )
            .await;

        self.upload_log
            .record(id, media_type.as_str(), "uploaded")
            .await;
        tracing::info!(id, media_type = media_type.as_str(), "metadata uploaded");

        Ok(TitleResult {
            from: Source::Tmdb,
            meta_url,
            image_url: poster_ok.then_some(poster_url),
            backdrop_url: backdrop_ok.then_some(backdrop_url),
            metadata: Some(metadata),
        })
    }

    /// Cache-aside flow for one TV episode.
    pub async fn get_episode(
        &self,
        tv_id: &str,
        season: &str,
        episode: &str,
    ) -> Result<EpisodeResult, CacheError> {
        let paths = EpisodePaths::new(tv_id, season, episode);
        let meta_url = self.store.cdn_url(&paths.meta);
        let still_url = self.store.cdn_url(&paths.still);

        if self.store.exists(&paths.meta).await {
            tracing::info!(tv_id, season, episode, "serving episode from CDN cache");
            return Ok(EpisodeResult {
                from: Source::Cdn,
                meta_url,
                image_url: Some(still_url),
                metadata: None,
            });
        }

        let metadata = self.tmdb.fetch_episode(tv_id, season, episode).await?;
        let body = serde_json::to_vec_pretty(&metadata)?;
        self.store.upload(&paths.meta, body.into()).await?;

        let still_ok = self
            .mirror_image(tv_id, metadata.still_path.as_deref(), &paths.still, "still")
            .await;

        let label = format!("episode {season}-{episode}");
        self.upload_log.record(tv_id, &label, "uploaded").await;
        tracing::info!(tv_id, season, episode, "episode metadata uploaded");

        Ok(EpisodeResult {
            from: Source::Tmdb,
            meta_url,
            image_url: still_ok.then_some(still_url),
            metadata: Some(metadata),
        })
    }

    /// Run the title flow for each id with bounded concurrency.
    ///
    /// `buffered` caps in-flight work and yields results in input order, so
    /// the response always has one entry per input id, position for
    /// position. Per-item failures stay in their slot.
    pub async fn get_batch(&self, ids: &[String], media_type: MediaType) -> Vec<BatchItem> {
        stream::iter(ids.iter().cloned())
            .map(|id| {
                let service = self.clone();
                async move {
                    let outcome = service.get_title(&id, media_type).await;
                    if let Err(err) = &outcome {
                        tracing::error!(id, error = %err, "batch item failed");
                    }
                    BatchItem { id, outcome }
                }
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await
    }

    /// Fetch one image from TMDB and upload it to the store.
    ///
    /// Non-fatal by contract: every failure path (absent reference, download
    /// exhausted retries, upload rejected) is logged and reported as `false`
    /// so the caller nulls that image's URL and carries on.
    async fn mirror_image(
        &self,
        id: &str,
        reference: Option<&str>,
        path: &str,
        kind: &str,
    ) -> bool {
        let bytes = match self.tmdb.fetch_image(reference).await {
            Ok(bytes) => bytes,
            Err(CacheError::MissingImagePath) => {
                tracing::debug!(id, kind, "no image reference in metadata, skipping");
                return false;
            }
            Err(err) => {
                tracing::warn!(id, kind, error = %err, "image download failed");
                return false;
            }
        };
        match self.store.upload(path, bytes).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(id, kind, error = %err, "image upload failed");
                false
            }
        }
    }
}
