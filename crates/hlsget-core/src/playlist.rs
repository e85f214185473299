//! Manifest resolution
//!
//! Fetches the m3u8 playlist and turns it into the ordered segment
//! list the pipeline consumes. Master/variant playlists are rejected;
//! relative segment and key URIs are resolved against the manifest
//! URL, and an `EXT-X-KEY` stays active for every following segment
//! that does not declare its own.

use crate::error::HlsgetError;
use hlsget_types::{Segment, SegmentKey};
use m3u8_rs::{Key, KeyMethod, Playlist};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use url::Url;

/// Fetch and parse the playlist at `url` into segment descriptors.
pub async fn fetch_media_segments(
    url: &Url,
    client: &Client,
    headers: &HeaderMap,
) -> Result<Vec<Segment>, HlsgetError> {
    let response = client
        .get(url.clone())
        .headers(headers.clone())
        .send()
        .await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(HlsgetError::Manifest(format!(
            "manifest request returned HTTP {status}"
        )));
    }
    let body = response.bytes().await?;
    segments_from_playlist(&body, url)
}

/// Parse raw playlist bytes into segment descriptors.
pub(crate) fn segments_from_playlist(
    body: &[u8],
    base: &Url,
) -> Result<Vec<Segment>, HlsgetError> {
    let playlist = m3u8_rs::parse_playlist_res(body)
        .map_err(|e| HlsgetError::Manifest(format!("failed to parse playlist: {e}")))?;

    let media = match playlist {
        Playlist::MediaPlaylist(media) => media,
        Playlist::MasterPlaylist(_) => {
            return Err(HlsgetError::Manifest(
                "playlist is a master playlist, expected a media playlist".to_string(),
            ));
        }
    };

    let mut segments = Vec::with_capacity(media.segments.len());
    let mut active_key: Option<SegmentKey> = None;

    for (index, seg) in media.segments.iter().enumerate() {
        if let Some(key) = &seg.key {
            active_key = resolve_key(key, base)?;
        }

        let uri = resolve_uri(&seg.uri, base)?;
        let mut segment = Segment::new(media.media_sequence + index as u64, uri.into());
        segment.key = active_key.clone();
        segments.push(segment);
    }

    Ok(segments)
}

/// Resolve an `EXT-X-KEY` tag to a key reference, or `None` for
/// `METHOD=NONE` (which turns encryption off for following segments).
fn resolve_key(key: &Key, base: &Url) -> Result<Option<SegmentKey>, HlsgetError> {
    match key.method {
        KeyMethod::None => Ok(None),
        KeyMethod::AES128 => {
            let uri = key.uri.as_deref().ok_or_else(|| {
                HlsgetError::Manifest("AES-128 key tag is missing a URI".to_string())
            })?;
            let iv = key.iv.as_deref().map(parse_iv).transpose()?;
            Ok(Some(SegmentKey {
                uri: resolve_uri(uri, base)?.into(),
                iv,
            }))
        }
        ref other => Err(HlsgetError::Manifest(format!(
            "unsupported key method: {other:?}"
        ))),
    }
}

fn resolve_uri(uri: &str, base: &Url) -> Result<Url, HlsgetError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        Url::parse(uri).map_err(|_| HlsgetError::InvalidUrl(uri.to_string()))
    } else {
        base.join(uri).map_err(|_| {
            HlsgetError::Manifest(format!("could not resolve {uri} against {base}"))
        })
    }
}

fn parse_iv(iv: &str) -> Result<[u8; 16], HlsgetError> {
    let hex_str = iv.trim_start_matches("0x").trim_start_matches("0X");
    let mut bytes = [0u8; 16];
    hex::decode_to_slice(hex_str, &mut bytes)
        .map_err(|e| HlsgetError::Manifest(format!("failed to parse IV '{iv}': {e}")))?;
    Ok(bytes)
}
