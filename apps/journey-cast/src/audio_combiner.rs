//! Audio Combining - Stitch per-segment TTS payloads into one episode track
//!
//! This module provides:
//! - Base64 decode of every TTS payload
//! - Byte-level concatenation in input order
//! - Data URI wrapping for playback elements
//! - Export of a finished track to disk
//!
//! **Note**: combination is raw byte concatenation of independently encoded
//! MP3 streams, not a format-aware remux. Playback relies on the decoder
//! accepting back-to-back MP3 frames; no resampling or cross-fading happens.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

// ============================================================================
// DATA MODELS
// ============================================================================

/// MIME prefix used for playable episode audio
pub const DATA_URI_PREFIX: &str = "data:audio/mp3;base64,";

/// Outcome of combining base64 chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombinedAudio {
    /// Decoded chunks concatenated and re-encoded
    Combined {
        base64: String,
        /// Chunks that made it into the output
        chunk_count: usize,
        /// Chunks dropped because they did not decode
        dropped: usize,
    },
    /// No chunk decoded; the first input is passed through untouched
    FirstChunkFallback(String),
    /// Nothing to combine
    Empty,
}

impl CombinedAudio {
    /// Payload to hand downstream, if any
    pub fn base64(&self) -> Option<&str> {
        match self {
            CombinedAudio::Combined { base64, .. } => Some(base64),
            CombinedAudio::FirstChunkFallback(first) => Some(first),
            CombinedAudio::Empty => None,
        }
    }

    pub fn into_base64(self) -> Option<String> {
        match self {
            CombinedAudio::Combined { base64, .. } => Some(base64),
            CombinedAudio::FirstChunkFallback(first) => Some(first),
            CombinedAudio::Empty => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CombinedAudio::FirstChunkFallback(_))
    }
}

// ============================================================================
// AUDIO COMBINER
// ============================================================================

/// Audio combiner
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioCombiner;

impl AudioCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Combine base64 audio chunks in order.
    ///
    /// Undecodable chunks are dropped with a warning. If none decode, the
    /// first input is returned verbatim as [`CombinedAudio::FirstChunkFallback`].
    pub fn combine<S: AsRef<str>>(&self, chunks: &[S]) -> CombinedAudio {
        let Some(first) = chunks.first() else {
            log::warn!("No audio chunks to combine");
            return CombinedAudio::Empty;
        };

        log::info!("Combining {} audio chunks", chunks.len());

        let mut decoded = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            match decode_base64(chunk.as_ref()) {
                Ok(bytes) => decoded.push(bytes),
                Err(e) => log::warn!("Error decoding base64 chunk {}: {}", i, e),
            }
        }

        if decoded.is_empty() {
            log::error!("No valid audio chunks to combine, passing the first chunk through");
            return CombinedAudio::FirstChunkFallback(first.as_ref().to_string());
        }

        let total_len: usize = decoded.iter().map(Vec::len).sum();
        let mut combined = Vec::with_capacity(total_len);
        for bytes in &decoded {
            combined.extend_from_slice(bytes);
        }

        let chunk_count = decoded.len();
        log::info!(
            "Successfully combined {} audio chunks ({} bytes)",
            chunk_count,
            total_len
        );

        CombinedAudio::Combined {
            base64: STANDARD.encode(&combined),
            chunk_count,
            dropped: chunks.len() - chunk_count,
        }
    }
}

/// Decode a base64 payload, tolerating embedded whitespace/line breaks
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if payload.chars().any(char::is_whitespace) {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(payload)
    }
}

/// Wrap a base64 MP3 payload as a playable data URI
pub fn to_data_uri(base64: &str) -> String {
    format!("{}{}", DATA_URI_PREFIX, base64)
}

/// Payload part of a data URI produced by [`to_data_uri`]
pub fn parse_data_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(DATA_URI_PREFIX)
}

/// Write a base64 payload to `path` as raw audio bytes, returning the size
pub fn write_audio_file(path: &Path, base64: &str) -> std::io::Result<u64> {
    let bytes = decode_base64(base64)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(&bytes)?;

    log::info!("Audio written: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.len() as u64)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_single_chunk_round_trips() {
        let chunk = b64(b"\xff\xfb\x90\x00single frame");
        let combined = AudioCombiner::new().combine(&[chunk.clone()]);

        assert_eq!(combined.base64(), Some(chunk.as_str()));
        assert!(!combined.is_fallback());
    }

    #[test]
    fn test_concatenates_in_order() {
        let chunks = vec![b64(b"first-"), b64(b"second-"), b64(b"third")];
        let combined = AudioCombiner::new().combine(&chunks);

        match combined {
            CombinedAudio::Combined {
                base64,
                chunk_count,
                dropped,
            } => {
                assert_eq!(STANDARD.decode(base64).unwrap(), b"first-second-third");
                assert_eq!(chunk_count, 3);
                assert_eq!(dropped, 0);
            }
            other => panic!("expected combination, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_chunk_is_dropped() {
        let chunks = vec![b64(b"ab"), "%%% not base64 %%%".to_string(), b64(b"cd")];
        let combined = AudioCombiner::new().combine(&chunks);

        match combined {
            CombinedAudio::Combined {
                base64, dropped, ..
            } => {
                assert_eq!(STANDARD.decode(base64).unwrap(), b"abcd");
                assert_eq!(dropped, 1);
            }
            other => panic!("expected combination, got {:?}", other),
        }
    }

    #[test]
    fn test_all_bad_falls_back_to_first_chunk() {
        let chunks = vec!["!!first!!".to_string(), "??second??".to_string()];
        let combined = AudioCombiner::new().combine(&chunks);

        assert_eq!(combined, CombinedAudio::FirstChunkFallback("!!first!!".into()));
        assert!(combined.is_fallback());
    }

    #[test]
    fn test_empty_input() {
        let combined = AudioCombiner::new().combine::<String>(&[]);

        assert_eq!(combined, CombinedAudio::Empty);
        assert_eq!(combined.base64(), None);
    }

    #[test]
    fn test_whitespace_in_payload_is_tolerated() {
        let wrapped = "aGVs\nbG8=";
        assert_eq!(decode_base64(wrapped).unwrap(), b"hello");
    }

    #[test]
    fn test_data_uri() {
        let uri = to_data_uri("QUJD");
        assert_eq!(uri, "data:audio/mp3;base64,QUJD");
        assert_eq!(parse_data_uri(&uri), Some("QUJD"));
        assert_eq!(parse_data_uri("data:audio/wav;base64,QUJD"), None);
    }

    #[test]
    fn test_write_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes").join("01-intro.mp3");

        let size = write_audio_file(&path, &b64(b"mp3 bytes")).unwrap();

        assert_eq!(size, 9);
        assert_eq!(std::fs::read(&path).unwrap(), b"mp3 bytes");
    }
}
