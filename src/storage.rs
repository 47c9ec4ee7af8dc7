//! Asset storage seam and shipped store implementations.
//!
//! Image layers do not carry their pixel buffers into the document model —
//! the document references a durable URL and the bytes live wherever the
//! host keeps assets. [`AssetStore`] is that seam: one async call, PNG bytes
//! and a layer name in, URL out. The store is treated as stateless and
//! independently retryable; the pipeline handles retry/backoff/timeout
//! around it and converts terminal failures into per-layer skips.
//!
//! Three implementations ship with the crate:
//!
//! * [`DataUriStore`] — inline `data:` URIs, no I/O, never fails. The
//!   default when no store is configured, so the pipeline is usable with
//!   zero setup.
//! * [`FsAssetStore`] — writes PNGs into a directory, returns `file://`
//!   URLs. Useful for local preview builds and tests.
//! * [`HttpAssetStore`] — POSTs the PNG to an upload endpoint and expects
//!   the durable URL back in the response body (a minimal CDN client).

use crate::id::sanitize;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Errors surfaced by an asset store. The pipeline never propagates these
/// to the caller; they end up inside [`crate::error::LayerError`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store refused the upload (HTTP error status, validation, quota).
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// Transport or filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

/// Durable storage for externalized layer images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store an encoded PNG under the given layer name, returning a durable
    /// URL for the document model.
    async fn store(&self, bytes: Vec<u8>, name: &str) -> Result<String, StorageError>;
}

/// Inlines the PNG as a `data:image/png;base64,…` URI.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUriStore;

#[async_trait]
impl AssetStore for DataUriStore {
    async fn store(&self, bytes: Vec<u8>, name: &str) -> Result<String, StorageError> {
        debug!(layer = name, size = bytes.len(), "inlining image as data URI");
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
    }
}

/// Writes PNGs into a directory, returning `file://` URLs.
///
/// Filenames derive from the sanitised layer name; a numeric suffix avoids
/// clobbering when two layers share a name. Creation uses `create_new` so
/// concurrent uploads of same-named layers cannot race onto one file.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn store(&self, bytes: Vec<u8>, name: &str) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let stem = sanitize(name);
        for attempt in 0u32.. {
            let filename = if attempt == 0 {
                format!("{stem}.png")
            } else {
                format!("{stem}_{attempt}.png")
            };
            let path = self.root.join(filename);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&bytes).await?;
                    file.flush().await?;
                    debug!(layer = name, path = %path.display(), "stored image asset");
                    return Ok(format!("file://{}", path.display()));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("attempt counter exhausted");
    }
}

/// Uploads PNGs to an HTTP endpoint; the response body is the asset URL.
#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAssetStore {
    /// Build a store for the given upload endpoint. `timeout_secs` bounds a
    /// single request; the pipeline layers its own retry policy on top.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn store(&self, bytes: Vec<u8>, name: &str) -> Result<String, StorageError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Rejected(format!("HTTP {status}")));
        }

        let url = response
            .text()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let url = url.trim().to_string();
        if url.is_empty() {
            return Err(StorageError::Rejected(
                "endpoint returned an empty asset URL".into(),
            ));
        }
        debug!(layer = name, url = %url, "uploaded image asset");
        Ok(url)
    }
}
