//! Error types for hlsget core

use thiserror::Error;

/// Errors that can occur while downloading an HLS stream
#[derive(Debug, Error)]
pub enum HlsgetError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL is not reachable: HTTP {0}")]
    UrlNotReachable(u16),

    #[error("Invalid output path: {0}")]
    InvalidOutput(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl HlsgetError {
    /// Check if this error is worth retrying in place.
    ///
    /// Connection failures, timeouts, and interrupted body reads map
    /// to "transient"; a non-200 status or filesystem error never
    /// does.
    pub fn is_transient(&self) -> bool {
        match self {
            HlsgetError::Network(e) => e.is_connect() || e.is_timeout() || e.is_body(),
            _ => false,
        }
    }
}
