//! Joiner - ordered decrypt-and-concatenate into the final artifact
//!
//! Consumes the fully staged segment set in ascending sequence order.
//! Each staging file is deleted right after its plaintext is appended
//! so disk is freed incrementally. The first failure aborts the join;
//! partially written output is the caller's to discard.

use crate::engine::decrypt::decrypt_segment;
use crate::error::HlsgetError;
use hlsget_types::Segment;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub(crate) async fn join_segments(
    segments: &mut [Segment],
    output: &Path,
    client: &Client,
    headers: &HeaderMap,
) -> Result<PathBuf, HlsgetError> {
    segments.sort_by_key(|s| s.seq_id);

    let mut file = File::create(output).await?;
    for segment in segments.iter() {
        let data = decrypt_segment(segment, client, headers).await?;
        file.write_all(&data).await?;
        if let Some(staging) = &segment.staging_path {
            tokio::fs::remove_file(staging).await?;
        }
    }
    file.flush().await?;
    file.sync_all().await?;

    info!("Joined {} segments into {}", segments.len(), output.display());
    Ok(output.to_path_buf())
}
