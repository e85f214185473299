//! Decryption unit
//!
//! Turns a segment's staged raw bytes into its plaintext payload:
//! AES-128-CBC when the descriptor carries a key reference, trailing
//! byte-count unpadding, and a trim of any leading bytes before the
//! first TS sync byte.

use crate::error::HlsgetError;
use aes::Aes128;
use cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use hlsget_types::{Segment, SegmentKey};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// MPEG-TS packet sync byte.
const SYNC_BYTE: u8 = 0x47;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Read a segment's staging file and return its plaintext payload.
pub(crate) async fn decrypt_segment(
    segment: &Segment,
    client: &Client,
    headers: &HeaderMap,
) -> Result<Vec<u8>, HlsgetError> {
    let staging = segment.staging_path.as_deref().ok_or_else(|| {
        HlsgetError::InvalidOperation(format!("segment {} has no staging path", segment.seq_id))
    })?;
    let mut data = tokio::fs::read(staging).await?;

    if let Some(key_ref) = &segment.key {
        let key = fetch_key(key_ref, client, headers).await?;
        let iv = key_ref.iv.unwrap_or_else(|| default_iv(segment.seq_id));
        data = decrypt_aes128(&data, &key, &iv)?;
        debug!("Decrypted segment {}", segment.seq_id);
    }

    trim_to_sync_byte(&mut data);
    Ok(data)
}

/// Fetch the 16-byte AES key referenced by a segment. A non-200 key
/// response is fatal.
async fn fetch_key(
    key: &SegmentKey,
    client: &Client,
    headers: &HeaderMap,
) -> Result<Vec<u8>, HlsgetError> {
    let response = client
        .get(&key.uri)
        .headers(headers.clone())
        .send()
        .await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(HlsgetError::Decryption(format!(
            "key fetch from {} returned HTTP {status}",
            key.uri
        )));
    }
    let bytes = response.bytes().await?;
    if bytes.len() != 16 {
        return Err(HlsgetError::Decryption(format!(
            "key from {} is {} bytes, expected 16",
            key.uri,
            bytes.len()
        )));
    }
    Ok(bytes.to_vec())
}

/// Legacy default IV for playlists that omit one: the segment's
/// sequence number, big-endian, in the low 8 bytes of a zeroed
/// 16-byte buffer.
fn default_iv(seq_id: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[8..].copy_from_slice(&seq_id.to_be_bytes());
    iv
}

/// AES-128-CBC decryption followed by trailing byte-count unpadding.
fn decrypt_aes128(data: &[u8], key: &[u8], iv: &[u8; 16]) -> Result<Vec<u8>, HlsgetError> {
    let decryptor = Aes128CbcDec::new_from_slices(key, iv).map_err(|e| {
        HlsgetError::Decryption(format!("failed to initialize AES-128-CBC decryptor: {e}"))
    })?;

    let mut buffer = data.to_vec();
    let plain_len = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|e| HlsgetError::Decryption(format!("decryption failed: {e}")))?
        .len();
    buffer.truncate(plain_len);
    strip_trailing_padding(&mut buffer);
    Ok(buffer)
}

/// Remove padding per the trailing-byte-count convention: the last
/// byte's value is the number of padding bytes to strip. A count
/// larger than the buffer is ignored.
fn strip_trailing_padding(data: &mut Vec<u8>) {
    if let Some(&last) = data.last() {
        let pad = last as usize;
        if pad <= data.len() {
            data.truncate(data.len() - pad);
        }
    }
}

/// Discard any leading bytes before the first sync byte. Encoders
/// occasionally prepend non-payload bytes before the first valid TS
/// packet.
fn trim_to_sync_byte(data: &mut Vec<u8>) {
    if let Some(pos) = data.iter().position(|&b| b == SYNC_BYTE) {
        if pos > 0 {
            data.drain(..pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::BlockEncryptMut;

    type Aes128CbcEnc = cbc::Encryptor<Aes128>;

    fn encrypt_aes128(plain: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
        assert_eq!(plain.len() % 16, 0, "test vectors are pre-padded");
        let mut buffer = plain.to_vec();
        Aes128CbcEnc::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(&mut buffer, plain.len())
            .unwrap();
        buffer
    }

    #[test]
    fn default_iv_encodes_sequence_in_low_bytes() {
        let iv = default_iv(0x0102030405060708);
        assert_eq!(iv[..8], [0u8; 8]);
        assert_eq!(iv[8..], [1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(default_iv(0), [0u8; 16]);
    }

    #[test]
    fn trailing_padding_strips_exactly_count_bytes() {
        let mut data = vec![10, 20, 30, 40, 3, 3, 3];
        strip_trailing_padding(&mut data);
        assert_eq!(data, vec![10, 20, 30, 40]);
    }

    #[test]
    fn oversized_padding_count_is_ignored() {
        let mut data = vec![1, 2, 200];
        strip_trailing_padding(&mut data);
        assert_eq!(data, vec![1, 2, 200]);

        let mut empty: Vec<u8> = Vec::new();
        strip_trailing_padding(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn sync_byte_trim_discards_leading_garbage() {
        let mut data = vec![0x00, 0xff, SYNC_BYTE, 0xaa, 0xbb];
        trim_to_sync_byte(&mut data);
        assert_eq!(data, vec![SYNC_BYTE, 0xaa, 0xbb]);
    }

    #[test]
    fn sync_byte_trim_keeps_aligned_data_untouched() {
        let mut data = vec![SYNC_BYTE, 1, 2, 3];
        trim_to_sync_byte(&mut data);
        assert_eq!(data, vec![SYNC_BYTE, 1, 2, 3]);

        // No sync byte at all: nothing is discarded.
        let mut data = vec![1, 2, 3];
        trim_to_sync_byte(&mut data);
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn aes128_cbc_round_trip_with_trailing_pad() {
        let key = [0x42u8; 16];
        let iv = default_iv(7);

        // 28 payload bytes plus 4 bytes of pad value 4.
        let mut padded = Vec::new();
        padded.push(SYNC_BYTE);
        padded.extend_from_slice(&[0xabu8; 27]);
        padded.extend_from_slice(&[4u8; 4]);
        assert_eq!(padded.len(), 32);

        let encrypted = encrypt_aes128(&padded, &key, &iv);
        assert_ne!(encrypted, padded);

        let decrypted = decrypt_aes128(&encrypted, &key, &iv).unwrap();
        assert_eq!(decrypted, padded[..28].to_vec());
    }

    #[test]
    fn unaligned_ciphertext_is_rejected() {
        let key = [0u8; 16];
        let iv = [0u8; 16];
        let err = decrypt_aes128(&[1, 2, 3], &key, &iv).unwrap_err();
        assert!(matches!(err, HlsgetError::Decryption(_)));
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let err = decrypt_aes128(&[0u8; 16], &[0u8; 5], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, HlsgetError::Decryption(_)));
    }
}
