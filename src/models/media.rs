//! Normalized metadata records built from raw TMDB documents.
//!
//! TMDB uses different field names for movies and TV shows (`title` vs
//! `name`, `release_date` vs `first_air_date`); normalization folds both into
//! one stable shape so the JSON persisted to the store never depends on the
//! media type that produced it.

use serde::{Deserialize, Serialize};

/// TMDB provides no content rating on the documents we fetch, so the
/// normalized record always carries this placeholder.
pub const AGE_RATING_PLACEHOLDER: &str = "Not rated";

/// Kind of media a request targets.
///
/// Episodes are not a top-level type: they are addressed through a TV show
/// id plus season/episode numbers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    /// Parse the `type` query parameter. Anything other than exactly
    /// `movie` or `tv` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaType::Movie),
            "tv" => Some(MediaType::Tv),
            _ => None,
        }
    }
}

/// Raw movie/TV document as returned by `GET /3/{type}/{id}`.
///
/// Every field is optional: TMDB omits or nulls fields freely and a missing
/// field must never fail deserialization.
#[derive(Deserialize, Debug)]
pub struct TmdbTitleDoc {
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub genres: Option<Vec<TmdbGenre>>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
    pub original_language: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

/// Genre entry inside a TMDB title document. Only the name survives
/// normalization.
#[derive(Deserialize, Debug)]
pub struct TmdbGenre {
    pub name: String,
}

/// Raw episode document as returned by
/// `GET /3/tv/{id}/season/{season}/episode/{episode}`.
#[derive(Deserialize, Debug)]
pub struct TmdbEpisodeDoc {
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub vote_average: Option<f64>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub still_path: Option<String>,
}

/// Normalized movie/TV metadata, the shape persisted as
/// `metadata/{type}_{id}.json` and returned on a cache miss.
///
/// Never mutated after construction.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TitleMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genres: Option<Vec<String>>,
    pub release_date: Option<String>,
    pub average_vote: Option<f64>,
    pub original_language: Option<String>,
    pub age_rating: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

impl From<TmdbTitleDoc> for TitleMetadata {
    fn from(doc: TmdbTitleDoc) -> Self {
        Self {
            // Movies carry `title`, TV shows carry `name`. TMDB occasionally
            // sends an empty string instead of omitting the field; treat it
            // as absent so the fallback still applies.
            title: non_empty(doc.title).or(non_empty(doc.name)),
            description: doc.overview,
            genres: doc
                .genres
                .map(|genres| genres.into_iter().map(|g| g.name).collect()),
            release_date: non_empty(doc.release_date).or(non_empty(doc.first_air_date)),
            average_vote: doc.vote_average,
            original_language: doc.original_language,
            age_rating: AGE_RATING_PLACEHOLDER.to_string(),
            poster_path: doc.poster_path,
            backdrop_path: doc.backdrop_path,
        }
    }
}

/// Normalized episode metadata, persisted as
/// `metadata/episode_{id}_s{season}_e{episode}.json`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EpisodeMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub air_date: Option<String>,
    pub average_vote: Option<f64>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub still_path: Option<String>,
}

impl From<TmdbEpisodeDoc> for EpisodeMetadata {
    fn from(doc: TmdbEpisodeDoc) -> Self {
        Self {
            title: non_empty(doc.name),
            description: doc.overview,
            air_date: doc.air_date,
            average_vote: doc.vote_average,
            season_number: doc.season_number,
            episode_number: doc.episode_number,
            still_path: doc.still_path,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
