//! HTTP handlers for the single and batch metadata endpoints.
//!
//! Handlers validate query parameters, delegate the cache-aside flow to
//! `CacheService`, and shape the JSON responses. Response field names are a
//! stable contract with existing consumers (`metaUrl`, `imageUrl`,
//! `backdropUrl`).

use crate::{
    errors::AppError,
    models::media::{EpisodeMetadata, MediaType, TitleMetadata},
    services::cache_service::{CacheService, EpisodeResult, Source, TitleResult},
};
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Query params for `GET /api/getMetadata`.
#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

/// Query params for `GET /api/getBatchMetadata`.
#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub ids: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TitleResponse {
    from: Source,
    #[serde(rename = "metaUrl")]
    meta_url: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(rename = "backdropUrl")]
    backdrop_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<TitleMetadata>,
}

impl From<TitleResult> for TitleResponse {
    fn from(result: TitleResult) -> Self {
        Self {
            from: result.from,
            meta_url: result.meta_url,
            image_url: result.image_url,
            backdrop_url: result.backdrop_url,
            metadata: result.metadata,
        }
    }
}

#[derive(Serialize)]
struct EpisodeResponse {
    from: Source,
    #[serde(rename = "metaUrl")]
    meta_url: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<EpisodeMetadata>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub(crate) enum BatchEntry {
    Ok {
        id: String,
        #[serde(flatten)]
        result: TitleResponse,
    },
    Err {
        id: String,
        error: bool,
        message: String,
    },
}

#[derive(Serialize)]
pub(crate) struct BatchResponse {
    results: Vec<BatchEntry>,
}

/// `GET /api/getMetadata?id=&type=movie|tv[&season=&episode=]`
///
/// Episode variant when type is `tv` and both `season` and `episode` are
/// present; title variant otherwise. Cache hits return URLs only; misses
/// return the freshly fetched metadata too.
pub async fn get_metadata(
    State(service): State<CacheService>,
    Query(query): Query<MetadataQuery>,
) -> Result<Response, AppError> {
    let id = query.id.as_deref().filter(|s| !s.is_empty());
    let media_type = query.media_type.as_deref().and_then(MediaType::parse);
    let (Some(id), Some(media_type)) = (id, media_type) else {
        return Err(AppError::bad_request(r#"Invalid or missing "id" or "type""#));
    };

    // Present-but-empty season/episode values count as absent, so the
    // request falls back to the title flow instead of building degenerate
    // episode keys.
    let season = query.season.as_deref().filter(|s| !s.is_empty());
    let episode = query.episode.as_deref().filter(|s| !s.is_empty());

    if media_type == MediaType::Tv {
        if let (Some(season), Some(episode)) = (season, episode) {
            let result = service
                .get_episode(id, season, episode)
                .await
                .map_err(|err| {
                    tracing::error!(id, season, episode, error = %err, "episode flow failed");
                    AppError::from(err)
                })?;
            let EpisodeResult {
                from,
                meta_url,
                image_url,
                metadata,
            } = result;
            return Ok(Json(EpisodeResponse {
                from,
                meta_url,
                image_url,
                metadata,
            })
            .into_response());
        }
    }

    let result = service.get_title(id, media_type).await.map_err(|err| {
        tracing::error!(id, media_type = media_type.as_str(), error = %err, "title flow failed");
        AppError::from(err)
    })?;
    Ok(Json(TitleResponse::from(result)).into_response())
}

/// `GET /api/getBatchMetadata?ids=comma,separated&type=movie|tv`
///
/// Runs the title flow per id with bounded concurrency. Always 200 once the
/// params validate: per-id failures become `{id, error, message}` entries in
/// place, and the results array keeps input order.
pub async fn get_batch_metadata(
    State(service): State<CacheService>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<BatchResponse>, AppError> {
    let ids = query.ids.as_deref().filter(|s| !s.is_empty());
    let media_type = query.media_type.as_deref().and_then(MediaType::parse);
    let (Some(ids), Some(media_type)) = (ids, media_type) else {
        return Err(AppError::bad_request(
            r#"Missing or invalid "ids" or "type""#,
        ));
    };

    let id_list: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let items = service.get_batch(&id_list, media_type).await;
    let results = items
        .into_iter()
        .map(|item| match item.outcome {
            Ok(result) => BatchEntry::Ok {
                id: item.id,
                result: result.into(),
            },
            Err(err) => BatchEntry::Err {
                id: item.id,
                error: true,
                message: err.to_string(),
            },
        })
        .collect();

    Ok(Json(BatchResponse { results }))
}
