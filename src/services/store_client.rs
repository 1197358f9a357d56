//! Client for the CDN-backed object store.
//!
//! Writes go to the storage region endpoint with the account write key;
//! reads (and existence probes) go against the public CDN base, which is
//! also what the produced URLs point at. Paths are opaque strings — the
//! store applies no validation of its own.

use crate::errors::CacheError;
use axum::http::header;
use bytes::Bytes;
use reqwest::StatusCode;

#[derive(Clone, Debug)]
pub struct StoreClient {
    http: reqwest::Client,
    write_base: String,
    access_key: String,
    cdn_base: String,
}

impl StoreClient {
    pub fn new(
        write_base: impl Into<String>,
        access_key: impl Into<String>,
        cdn_base: impl Into<String>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            write_base: write_base.into(),
            access_key: access_key.into(),
            cdn_base: cdn_base.into(),
        })
    }

    /// Public URL the CDN serves `path` from once uploaded.
    pub fn cdn_url(&self, path: &str) -> String {
        format!("{}/{}", self.cdn_base, path)
    }

    /// Probe whether `path` is already cached, via a metadata-only HEAD
    /// against the CDN.
    ///
    /// Fails open to a miss: only an explicit 200 counts as found. Any other
    /// status or a network failure reads as "not cached", so a transient
    /// error costs a redundant re-fetch and re-upload, never a false hit.
    pub async fn exists(&self, path: &str) -> bool {
        match self.http.head(self.cdn_url(path)).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(err) => {
                tracing::debug!(path, error = %err, "existence probe failed, treating as miss");
                false
            }
        }
    }

    /// Upload `bytes` to `path` on the storage endpoint. No retry at this
    /// layer; any non-success response is an upload failure.
    pub async fn upload(&self, path: &str, bytes: Bytes) -> Result<(), CacheError> {
        let url = format!("{}/{}", self.write_base, path);
        let response = self
            .http
            .put(&url)
            .header("AccessKey", &self.access_key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|source| CacheError::Upload {
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CacheError::UploadRejected {
                path: path.to_string(),
                status: response.status(),
            });
        }
        Ok(())
    }

    /// Reachability check for the readiness probe: any HTTP response from
    /// the CDN base counts, only transport failures do not.
    pub async fn probe_cdn(&self) -> Result<(), reqwest::Error> {
        self.http.head(&self.cdn_base).send().await.map(|_| ())
    }
}
