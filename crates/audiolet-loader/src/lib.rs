//! # audiolet-loader
//!
//! Retrieves the raw bytes of an audio source.
//!
//! - `http`/`https` URLs are fetched with a single GET
//! - `file://` URLs and plain paths are read from disk
//! - Blobs are handed back as-is
//!
//! There are no retries, timeouts, or cancellation. Failures are logged and
//! returned to the caller.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::path::PathBuf;

use async_trait::async_trait;
use audiolet_core::{AudioSource, Blob, Error, HttpError, Result};
use bytes::Bytes;
use tracing::{debug, error};
use url::Url;

/// Produces the raw bytes of an audio source.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load the complete contents of `source`.
    async fn load(&self, source: &AudioSource) -> Result<Bytes>;
}

/// How a URL string should be read.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    fn parse(raw: &str) -> Result<Self> {
        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|()| Error::Http(HttpError::InvalidUrl(raw.to_string()))),
                // Drive letters parse as one-character schemes.
                scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(raw))),
                scheme => Err(Error::Http(HttpError::InvalidUrl(format!(
                    "unsupported scheme '{scheme}' in {raw}"
                )))),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::Local(PathBuf::from(raw))),
            Err(e) => Err(Error::Http(HttpError::InvalidUrl(format!("{raw}: {e}")))),
        }
    }
}

/// Loader backed by `reqwest` for remote URLs and `tokio::fs` for local files.
#[derive(Clone, Default)]
pub struct DefaultLoader {
    http: reqwest::Client,
}

impl DefaultLoader {
    /// Create a loader with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader that shares an existing HTTP client.
    pub const fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: Url) -> Result<Bytes> {
        debug!("Fetching {url}");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Http(HttpError::ConnectionFailed(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(HttpError::StatusError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {e}")))?;

        debug!("Fetched {} bytes from {url}", data.len());
        Ok(data)
    }

    async fn read_file(path: PathBuf) -> Result<Bytes> {
        debug!("Reading {}", path.display());
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        Ok(Bytes::from(data))
    }

    fn read_blob(blob: &Blob) -> Bytes {
        debug!("Reading blob of {} bytes", blob.len());
        blob.data()
    }
}

#[async_trait]
impl SourceLoader for DefaultLoader {
    async fn load(&self, source: &AudioSource) -> Result<Bytes> {
        let result = match source {
            AudioSource::Blob(blob) => Ok(Self::read_blob(blob)),
            AudioSource::Url(raw) => match Location::parse(raw) {
                Ok(Location::Remote(url)) => self.fetch(url).await,
                Ok(Location::Local(path)) => Self::read_file(path).await,
                Err(e) => Err(e),
            },
        };

        if let Err(e) = &result {
            error!("Failed to load {source}: {e}");
        }
        result
    }
}
