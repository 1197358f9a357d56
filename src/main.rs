use anyhow::Result;
use axum::http::{HeaderValue, Method};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod tests;

use services::{
    cache_service::CacheService, store_client::StoreClient, tmdb_client::TmdbClient,
    upload_log::UploadLog,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Environment + logging setup ---
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        cdn_base = %cfg.cdn_base,
        tmdb_api_base = %cfg.tmdb_api_base,
        batch_concurrency = cfg.batch_concurrency,
        "Starting metacache"
    );

    // --- Initialize clients + orchestrator ---
    let tmdb = TmdbClient::new(&cfg.tmdb_api_key, &cfg.tmdb_api_base, &cfg.tmdb_image_base)?;
    let store = StoreClient::new(
        &cfg.storage_write_base,
        &cfg.storage_access_key,
        &cfg.cdn_base,
    )?;
    let upload_log = UploadLog::new(&cfg.upload_log_path);
    let service = CacheService::new(tmdb, store, upload_log, cfg.batch_concurrency);

    // --- Build router ---
    let cors = CorsLayer::new()
        .allow_origin(cfg.frontend_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST]);
    let app = routes::routes::routes()
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Metadata server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
