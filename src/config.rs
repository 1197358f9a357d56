use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub tmdb_api_key: String,
    pub tmdb_api_base: String,
    pub tmdb_image_base: String,
    pub storage_write_base: String,
    pub storage_access_key: String,
    pub cdn_base: String,
    pub upload_log_path: String,
    pub frontend_origin: String,
    pub batch_concurrency: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "CDN-backed media metadata caching proxy")]
pub struct Args {
    /// Host to bind to (overrides METACACHE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// TMDB API key (overrides TMDB_API_KEY)
    #[arg(long)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL (overrides TMDB_API_BASE_URL)
    #[arg(long)]
    pub tmdb_api_base: Option<String>,

    /// TMDB image base URL, "original" rendition (overrides TMDB_IMAGE_BASE_URL)
    #[arg(long)]
    pub tmdb_image_base: Option<String>,

    /// Storage write endpoint (overrides BUNNY_STORAGE_REGION_URL)
    #[arg(long)]
    pub storage_url: Option<String>,

    /// Storage write access key (overrides BUNNY_API_KEY)
    #[arg(long)]
    pub storage_key: Option<String>,

    /// Public CDN read base URL (overrides CDN_BASE_URL)
    #[arg(long)]
    pub cdn_base: Option<String>,

    /// Upload log file path (overrides UPLOAD_LOG_PATH)
    #[arg(long)]
    pub upload_log: Option<String>,

    /// Allowed CORS origin (overrides FRONTEND_ORIGIN)
    #[arg(long)]
    pub frontend_origin: Option<String>,

    /// Max concurrent upstream flows per batch request (overrides BATCH_CONCURRENCY)
    #[arg(long)]
    pub batch_concurrency: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("METACACHE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading PORT"),
        };
        let env_concurrency = match env::var("BATCH_CONCURRENCY") {
            Ok(value) => Some(
                value
                    .parse::<usize>()
                    .with_context(|| format!("parsing BATCH_CONCURRENCY value `{}`", value))?,
            ),
            Err(_) => None,
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            tmdb_api_key: required(args.tmdb_api_key, "TMDB_API_KEY")?,
            tmdb_api_base: normalize_base(optional(
                args.tmdb_api_base,
                "TMDB_API_BASE_URL",
                "https://api.themoviedb.org/3",
            )),
            tmdb_image_base: normalize_base(optional(
                args.tmdb_image_base,
                "TMDB_IMAGE_BASE_URL",
                "https://image.tmdb.org/t/p/original",
            )),
            storage_write_base: normalize_base(required(
                args.storage_url,
                "BUNNY_STORAGE_REGION_URL",
            )?),
            storage_access_key: required(args.storage_key, "BUNNY_API_KEY")?,
            cdn_base: normalize_base(required(args.cdn_base, "CDN_BASE_URL")?),
            upload_log_path: optional(args.upload_log, "UPLOAD_LOG_PATH", "./logs/uploads.log"),
            frontend_origin: optional(
                args.frontend_origin,
                "FRONTEND_ORIGIN",
                "http://localhost:3001",
            ),
            batch_concurrency: args.batch_concurrency.or(env_concurrency).unwrap_or(8),
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// CLI value, else env var, else a hard error naming the variable.
fn required(cli: Option<String>, var: &str) -> Result<String> {
    match cli {
        Some(value) => Ok(value),
        None => env::var(var).with_context(|| format!("{} must be set", var)),
    }
}

/// CLI value, else env var, else the built-in default.
fn optional(cli: Option<String>, var: &str, default: &str) -> String {
    cli.or_else(|| env::var(var).ok())
        .unwrap_or_else(|| default.into())
}

/// URLs are joined as `{base}/{path}`; a trailing slash in config would
/// produce double slashes in every produced URL.
fn normalize_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}
