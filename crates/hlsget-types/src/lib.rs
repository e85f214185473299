//! Shared types for hlsget
//!
//! This crate contains the data structures shared between the core
//! engine and the CLI front end.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One fetchable unit of the media stream.
///
/// `seq_id` values are unique across a playlist and define the byte
/// order of the final artifact, independent of download completion
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Media sequence number, unique and totally ordered.
    pub seq_id: u64,
    /// Absolute URL of the segment payload.
    pub uri: String,
    /// Decryption key reference, if the segment is encrypted.
    pub key: Option<SegmentKey>,
    /// Local staging file, assigned by the pipeline before dispatch.
    pub staging_path: Option<PathBuf>,
}

impl Segment {
    pub fn new(seq_id: u64, uri: String) -> Self {
        Self {
            seq_id,
            uri,
            key: None,
            staging_path: None,
        }
    }
}

/// AES-128 key reference for an encrypted segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentKey {
    /// Absolute URL the 16-byte key is fetched from.
    pub uri: String,
    /// Explicit initialization vector from the playlist, if present.
    /// When absent, the IV is derived from the segment's `seq_id`.
    pub iv: Option<[u8; 16]>,
}

/// Progress reporting capability.
///
/// Invoked once per successfully downloaded segment. Absent means
/// no-op; implementations must never be used for control decisions.
pub trait Progress: Send + Sync {
    fn increment(&self);
}
