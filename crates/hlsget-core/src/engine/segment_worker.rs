//! Segment worker - downloads single segments to staging files
//!
//! Each worker repeatedly takes the next descriptor from the shared
//! queue and streams the segment body to its staging file. A failed
//! segment is reported and the worker moves on to the next item; only
//! the global abort flag stops a worker early.

use crate::error::HlsgetError;
use futures::StreamExt;
use hlsget_types::Segment;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Outcome of one dispatched segment.
///
/// Emitted exactly once per descriptor a worker takes off the queue
/// while the pipeline is alive.
pub(crate) struct DownloadResult {
    pub seq_id: u64,
    pub error: Option<HlsgetError>,
}

/// Everything a worker shares with the coordinator.
pub(crate) struct WorkerContext {
    pub client: Client,
    pub headers: HeaderMap,
    pub queue: Arc<Mutex<mpsc::Receiver<Segment>>>,
    pub results: mpsc::Sender<DownloadResult>,
    pub aborted: Arc<AtomicBool>,
}

/// Worker loop: pull descriptors until the queue closes or the abort
/// flag is set.
pub(crate) async fn run_worker(ctx: WorkerContext) {
    loop {
        if ctx.aborted.load(Ordering::Acquire) {
            debug!("Abort signal observed, worker stopping");
            return;
        }

        let segment = { ctx.queue.lock().await.recv().await };
        let Some(segment) = segment else {
            // Queue drained and closed.
            return;
        };

        let Some(outcome) = download_with_retry(&ctx, &segment).await else {
            // Aborted mid-retry; the coordinator has already returned.
            return;
        };
        match &outcome {
            Ok(()) => info!("Downloaded segment {}", segment.seq_id),
            Err(e) => warn!("Error downloading segment {}: {e}", segment.seq_id),
        }

        let result = DownloadResult {
            seq_id: segment.seq_id,
            error: outcome.err(),
        };
        if ctx.results.send(result).await.is_err() {
            // Coordinator returned early, nobody is listening.
            return;
        }
    }
}

/// Download one segment, retrying transient failures up to
/// [`MAX_RETRIES`] times with a fixed delay. Returns `None` when the
/// abort flag is raised around a retry sleep.
async fn download_with_retry(
    ctx: &WorkerContext,
    segment: &Segment,
) -> Option<Result<(), HlsgetError>> {
    let mut attempts = 0u32;
    loop {
        match download_segment(ctx, segment).await {
            Ok(()) => return Some(Ok(())),
            Err(e) if e.is_transient() && attempts < MAX_RETRIES => {
                attempts += 1;
                warn!(
                    "Transient failure on segment {}, retrying (attempt {attempts}/{MAX_RETRIES}): {e}",
                    segment.seq_id
                );
                if ctx.aborted.load(Ordering::Acquire) {
                    return None;
                }
                tokio::time::sleep(RETRY_DELAY).await;
                if ctx.aborted.load(Ordering::Acquire) {
                    return None;
                }
            }
            Err(e) => return Some(Err(e)),
        }
    }
}

/// Fetch one segment's raw bytes into its staging file. The response
/// status must be exactly 200; the body is streamed to disk.
async fn download_segment(ctx: &WorkerContext, segment: &Segment) -> Result<(), HlsgetError> {
    let staging = segment.staging_path.as_deref().ok_or_else(|| {
        HlsgetError::InvalidOperation(format!(
            "segment {} was dispatched without a staging path",
            segment.seq_id
        ))
    })?;

    let response = ctx
        .client
        .get(&segment.uri)
        .headers(ctx.headers.clone())
        .send()
        .await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(HlsgetError::ServerError {
            status: status.as_u16(),
            message: format!("failed to download segment {}", segment.seq_id),
        });
    }

    let mut file = File::create(staging).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
