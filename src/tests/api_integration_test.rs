//! End-to-end tests for the metadata endpoints.
//!
//! Each test wires the full router against in-process mock upstreams (TMDB
//! API, TMDB image CDN, storage write endpoint, read CDN) served from one
//! axum router under distinct path prefixes, then drives the app over real
//! HTTP.

use crate::{
    routes,
    services::{
        cache_service::CacheService,
        store_client::StoreClient,
        tmdb_client::{RetryPolicy, TmdbClient},
        upload_log::UploadLog,
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde_json::{Value, json};
use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Clone)]
struct MockState {
    /// Count of metadata (not image) calls against the mock TMDB API.
    tmdb_hits: Arc<AtomicUsize>,
    /// Ids the mock TMDB API answers with 500.
    fail_ids: Arc<HashSet<String>>,
    /// Storage paths uploaded so far, in arrival order.
    uploads: Arc<Mutex<Vec<String>>>,
    /// Paths the mock CDN reports as already cached.
    cached: Arc<HashSet<String>>,
    /// Storage paths containing this substring are rejected with 500.
    fail_upload_containing: Option<String>,
}

struct World {
    app_base: String,
    tmdb_hits: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<String>>>,
    log_path: PathBuf,
    _log_dir: tempfile::TempDir,
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn mock_upstreams(state: MockState) -> Router {
    Router::new()
        .route(
            "/tmdb/tv/{id}/season/{season}/episode/{episode}",
            get(
                |State(state): State<MockState>,
                 Path((id, season, episode)): Path<(String, String, String)>| async move {
                    state.tmdb_hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "name": format!("Episode {id} S{season}E{episode}"),
                        "overview": "An episode.",
                        "air_date": "2013-09-15",
                        "vote_average": 9.0,
                        "season_number": season.parse::<u32>().ok(),
                        "episode_number": episode.parse::<u32>().ok(),
                        "still_path": format!("/still_{id}.jpg")
                    }))
                },
            ),
        )
        .route(
            "/tmdb/{kind}/{id}",
            get(
                |State(state): State<MockState>,
                 Path((kind, id)): Path<(String, String)>| async move {
                    state.tmdb_hits.fetch_add(1, Ordering::SeqCst);
                    if state.fail_ids.contains(&id) {
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                    let mut doc = json!({
                        "overview": "A story.",
                        "genres": [{"id": 18, "name": "Drama"}],
                        "vote_average": 7.5,
                        "original_language": "en",
                        "poster_path": format!("/poster_{id}.jpg"),
                        "backdrop_path": format!("/backdrop_{id}.jpg")
                    });
                    if kind == "tv" {
                        doc["name"] = json!(format!("Title {id}"));
                        doc["first_air_date"] = json!("2008-01-20");
                    } else {
                        doc["title"] = json!(format!("Title {id}"));
                        doc["release_date"] = json!("1999-10-15");
                    }
                    Ok(Json(doc))
                },
            ),
        )
        .route("/img/{*path}", get(|| async { b"jpegbytes".to_vec() }))
        .route(
            "/store/{*path}",
            put(
                |State(state): State<MockState>, Path(path): Path<String>| async move {
                    if let Some(needle) = &state.fail_upload_containing {
                        if path.contains(needle.as_str()) {
                            return StatusCode::INTERNAL_SERVER_ERROR;
                        }
                    }
                    state.uploads.lock().unwrap().push(path);
                    StatusCode::CREATED
                },
            ),
        )
        .route(
            "/cdn/{*path}",
            get(
                |State(state): State<MockState>, Path(path): Path<String>| async move {
                    if state.cached.contains(&path) {
                        StatusCode::OK
                    } else {
                        StatusCode::NOT_FOUND
                    }
                },
            ),
        )
        .with_state(state)
}

async fn build_world(
    cached: &[&str],
    fail_ids: &[&str],
    fail_upload_containing: Option<&str>,
) -> World {
    let tmdb_hits = Arc::new(AtomicUsize::new(0));
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        tmdb_hits: tmdb_hits.clone(),
        fail_ids: Arc::new(fail_ids.iter().map(|s| s.to_string()).collect()),
        uploads: uploads.clone(),
        cached: Arc::new(cached.iter().map(|s| s.to_string()).collect()),
        fail_upload_containing: fail_upload_containing.map(String::from),
    };
    let upstream_base = spawn_server(mock_upstreams(state)).await;

    let tmdb = TmdbClient::new(
        "test-key",
        format!("{upstream_base}/tmdb"),
        format!("{upstream_base}/img"),
    )
    .unwrap()
    .with_retry(RetryPolicy {
        attempts: 3,
        delay: Duration::from_millis(1),
    });
    let store = StoreClient::new(
        format!("{upstream_base}/store"),
        "test-write-key",
        format!("{upstream_base}/cdn"),
    )
    .unwrap();

    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("uploads.log");
    let service = CacheService::new(tmdb, store, UploadLog::new(&log_path), 4);

    let app_base = spawn_server(routes::routes::routes().with_state(service)).await;

    World {
        app_base,
        tmdb_hits,
        uploads,
        log_path,
        _log_dir: log_dir,
    }
}

async fn get_json(url: &str) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    let body: Value = response.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn cache_miss_fetches_uploads_and_returns_metadata() {
    let world = build_world(&[], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=550&type=movie",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "tmdb");
    assert_eq!(body["metadata"]["title"], "Title 550");
    assert_eq!(body["metadata"]["age_rating"], "Not rated");
    assert!(
        body["metaUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/metadata/movie_550.json")
    );
    assert!(
        body["imageUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/images/poster/movie_550.jpg")
    );
    assert!(
        body["backdropUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/images/backdrop/movie_550.jpg")
    );

    // Exactly one metadata fetch, one metadata upload, one upload per image.
    assert_eq!(world.tmdb_hits.load(Ordering::SeqCst), 1);
    let uploads = world.uploads.lock().unwrap().clone();
    assert_eq!(
        uploads,
        vec![
            "metadata/movie_550.json".to_string(),
            "images/poster/movie_550.jpg".to_string(),
            "images/backdrop/movie_550.jpg".to_string(),
        ]
    );

    let log = std::fs::read_to_string(&world.log_path).unwrap();
    assert!(log.contains(" | movie | ID: 550 | uploaded"));
}

#[tokio::test]
async fn cache_hit_returns_urls_without_upstream_calls() {
    let world = build_world(&["metadata/movie_550.json"], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=550&type=movie",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "cdn");
    assert!(body.get("metadata").is_none());
    assert!(body["imageUrl"].is_string());
    assert!(body["backdropUrl"].is_string());

    assert_eq!(world.tmdb_hits.load(Ordering::SeqCst), 0);
    assert!(world.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_backdrop_upload_nulls_only_that_url() {
    let world = build_world(&[], &[], Some("backdrop")).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=550&type=movie",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "tmdb");
    assert!(body["backdropUrl"].is_null());
    assert!(body["imageUrl"].is_string());
    assert_eq!(body["metadata"]["title"], "Title 550");

    let uploads = world.uploads.lock().unwrap().clone();
    assert!(uploads.contains(&"metadata/movie_550.json".to_string()));
    assert!(uploads.contains(&"images/poster/movie_550.jpg".to_string()));
    assert!(!uploads.iter().any(|p| p.contains("backdrop")));
}

#[tokio::test]
async fn failed_poster_upload_nulls_image_url() {
    let world = build_world(&[], &[], Some("poster")).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=550&type=movie",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["imageUrl"].is_null());
    assert!(body["backdropUrl"].is_string());
}

#[tokio::test]
async fn batch_keeps_input_order_and_isolates_failures() {
    let world = build_world(&[], &["2"], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getBatchMetadata?ids=1,%202,3&type=movie",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["id"], "1");
    assert_eq!(results[0]["from"], "tmdb");
    assert_eq!(results[0]["metadata"]["title"], "Title 1");

    assert_eq!(results[1]["id"], "2");
    assert_eq!(results[1]["error"], true);
    assert!(results[1]["message"].is_string());

    assert_eq!(results[2]["id"], "3");
    assert_eq!(results[2]["from"], "tmdb");

    // Ids 1 and 3 fetched once; id 2 exhausted its three attempts.
    assert_eq!(world.tmdb_hits.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn batch_cache_hits_carry_no_metadata() {
    let world = build_world(&["metadata/tv_7.json"], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getBatchMetadata?ids=7&type=tv",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let entry = &body["results"][0];
    assert_eq!(entry["from"], "cdn");
    assert!(entry.get("metadata").is_none());
    assert_eq!(world.tmdb_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_type_is_rejected_before_any_upstream_call() {
    let world = build_world(&[], &[], None).await;

    let (status, _) = get_json(&format!(
        "{}/api/getMetadata?id=550&type=game",
        world.app_base
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&format!("{}/api/getMetadata?type=movie", world.app_base)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&format!(
        "{}/api/getBatchMetadata?type=movie",
        world.app_base
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(world.tmdb_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn episode_miss_uses_episode_paths_and_label() {
    let world = build_world(&[], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=100&type=tv&season=1&episode=2",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "tmdb");
    assert!(
        body["metaUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/metadata/episode_100_s1_e2.json")
    );
    assert!(
        body["imageUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/images/episode/episode_100_s1_e2.jpg")
    );
    // Episodes have no backdrop field at all.
    assert!(body.get("backdropUrl").is_none());
    assert_eq!(body["metadata"]["episode_number"], 2);

    let uploads = world.uploads.lock().unwrap().clone();
    assert_eq!(
        uploads,
        vec![
            "metadata/episode_100_s1_e2.json".to_string(),
            "images/episode/episode_100_s1_e2.jpg".to_string(),
        ]
    );

    let log = std::fs::read_to_string(&world.log_path).unwrap();
    assert!(log.contains(" | episode 1-2 | ID: 100 | uploaded"));
}

#[tokio::test]
async fn episode_hit_skips_upstream() {
    let world = build_world(&["metadata/episode_100_s1_e2.json"], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=100&type=tv&season=1&episode=2",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "cdn");
    assert!(body.get("metadata").is_none());
    assert_eq!(world.tmdb_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn season_without_episode_falls_back_to_title_flow() {
    let world = build_world(&[], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=100&type=tv&season=1",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        body["metaUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/metadata/tv_100.json")
    );
}

#[tokio::test]
async fn empty_season_and_episode_fall_back_to_title_flow() {
    let world = build_world(&[], &[], None).await;

    let (status, body) = get_json(&format!(
        "{}/api/getMetadata?id=100&type=tv&season=&episode=",
        world.app_base
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "tmdb");
    assert!(
        body["metaUrl"]
            .as_str()
            .unwrap()
            .ends_with("/cdn/metadata/tv_100.json")
    );
    let uploads = world.uploads.lock().unwrap().clone();
    assert!(uploads.contains(&"metadata/tv_100.json".to_string()));
    assert!(!uploads.iter().any(|p| p.contains("episode")));
}

#[tokio::test]
async fn health_endpoints_respond() {
    let world = build_world(&[], &[], None).await;

    let (status, body) = get_json(&format!("{}/healthz", world.app_base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get_json(&format!("{}/readyz", world.app_base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["disk"]["ok"], true);
    assert_eq!(body["checks"]["cdn"]["ok"], true);
}
