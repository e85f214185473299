//! hlsget core - HLS download engine
//!
//! Fetches an HLS media playlist, downloads every segment over HTTP
//! with a bounded worker pool, decrypts AES-128 segments, and joins
//! them in sequence order into one output file.

mod engine;
mod error;
mod output;
mod playlist;

pub use error::HlsgetError;
pub use hlsget_types::{Progress, Segment, SegmentKey};

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_WORKERS: usize = 5;

/// A configured downloader for one HLS stream.
pub struct HlsgetDownloader {
    url: Url,
    output: PathBuf,
    client: Client,
    headers: HeaderMap,
    workers: usize,
    progress: Option<Arc<dyn Progress>>,
}

impl std::fmt::Debug for HlsgetDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HlsgetDownloader")
            .field("url", &self.url)
            .field("output", &self.output)
            .field("workers", &self.workers)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl HlsgetDownloader {
    /// Create a downloader for `url`, writing to `output` (a file, a
    /// directory, or nothing for a timestamped file in the current
    /// directory).
    ///
    /// Fails fast: the URL must answer a HEAD request with 200 and the
    /// output location must be writable before any segment work is
    /// queued.
    pub async fn new(url: &str, output: Option<&Path>) -> Result<Self, HlsgetError> {
        let url = Url::parse(url).map_err(|_| HlsgetError::InvalidUrl(url.to_string()))?;
        let client = Client::new();
        validate_url(&client, &url).await?;
        let output = output::resolve_output_path(output)?;

        Ok(Self {
            url,
            output,
            client,
            headers: HeaderMap::new(),
            workers: DEFAULT_WORKERS,
            progress: None,
        })
    }

    /// Replace the HTTP client used for manifest, key, and segment
    /// requests.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Headers injected into every request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Number of concurrent segment downloads. Must be at least 1.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, HlsgetError> {
        if workers < 1 {
            return Err(HlsgetError::InvalidOperation(
                "worker count must be at least 1".to_string(),
            ));
        }
        self.workers = workers;
        Ok(self)
    }

    /// Attach a progress sink, invoked once per downloaded segment.
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Where the joined stream will be written.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Run the full pipeline: resolve the manifest, fetch all segments
    /// concurrently into a staging directory, then decrypt and join
    /// them in sequence order.
    ///
    /// The staging directory is removed on every exit path, success or
    /// failure. Any single fatal error fails the whole download.
    pub async fn download(&self) -> Result<PathBuf, HlsgetError> {
        let mut segments =
            playlist::fetch_media_segments(&self.url, &self.client, &self.headers).await?;
        info!("Manifest lists {} segments", segments.len());

        let staging = tempfile::Builder::new()
            .prefix("hlsget-segments-")
            .tempdir()?;
        debug!("Staging directory: {}", staging.path().display());

        engine::fetch_all(
            &mut segments,
            staging.path(),
            &self.client,
            &self.headers,
            self.workers,
            self.progress.clone(),
        )
        .await?;

        engine::join_segments(&mut segments, &self.output, &self.client, &self.headers).await
        // `staging` is dropped here, deleting the directory and any
        // leftover files from segments that never completed.
    }
}

async fn validate_url(client: &Client, url: &Url) -> Result<(), HlsgetError> {
    let response = client.head(url.clone()).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(HlsgetError::UrlNotReachable(status.as_u16()));
    }
    Ok(())
}
