//! Pipeline coordinator - wires feeder, worker pool, and aggregation
//!
//! One feeder pushes descriptors into a shared pull queue in manifest
//! order, N workers consume it, and the coordinator aggregates their
//! results. The first fatal result raises the abort flag and fails the
//! whole fetch phase immediately; workers wind down on their own once
//! they observe the flag.

use crate::engine::segment_worker::{run_worker, DownloadResult, WorkerContext};
use crate::error::HlsgetError;
use hlsget_types::{Progress, Segment};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// Download every segment's raw bytes into the staging directory with
/// `workers` concurrent fetchers.
///
/// Staging paths are assigned to the descriptors up front so the
/// joiner can find them afterwards. Partial success is not exposed:
/// any single fatal segment error fails the whole phase.
pub(crate) async fn fetch_all(
    segments: &mut [Segment],
    staging_dir: &Path,
    client: &Client,
    headers: &HeaderMap,
    workers: usize,
    progress: Option<Arc<dyn Progress>>,
) -> Result<(), HlsgetError> {
    for segment in segments.iter_mut() {
        segment.staging_path = Some(staging_dir.join(format!("seg{}.ts", segment.seq_id)));
    }

    let (work_tx, work_rx) = mpsc::channel::<Segment>(workers);
    let queue = Arc::new(Mutex::new(work_rx));
    let (result_tx, mut result_rx) = mpsc::channel::<DownloadResult>(workers);
    let aborted = Arc::new(AtomicBool::new(false));

    for _ in 0..workers {
        let ctx = WorkerContext {
            client: client.clone(),
            headers: headers.clone(),
            queue: Arc::clone(&queue),
            results: result_tx.clone(),
            aborted: Arc::clone(&aborted),
        };
        tokio::spawn(run_worker(ctx));
    }
    // The workers now hold the only result senders; the channel
    // closing is the all-workers-finished signal.
    drop(result_tx);

    let feed: Vec<Segment> = segments.to_vec();
    let feeder_abort = Arc::clone(&aborted);
    tokio::spawn(async move {
        for segment in feed {
            if feeder_abort.load(Ordering::Acquire) {
                debug!("Feeder observed abort, closing queue");
                return;
            }
            if work_tx.send(segment).await.is_err() {
                // Every worker is gone.
                return;
            }
        }
    });

    let total = segments.len();
    let mut completed = 0usize;
    while let Some(result) = result_rx.recv().await {
        if let Some(err) = result.error {
            error!("Segment {} failed, aborting download: {err}", result.seq_id);
            aborted.store(true, Ordering::Release);
            return Err(err);
        }
        completed += 1;
        debug!("Segment {} done ({completed}/{total})", result.seq_id);
        if let Some(progress) = &progress {
            progress.increment();
        }
    }

    Ok(())
}
