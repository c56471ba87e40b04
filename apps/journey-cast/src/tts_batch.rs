//! TTS Batch Synthesis - Convert script segments to one episode track
//!
//! This module provides:
//! - The `SpeechSynthesizer` seam every TTS backend implements
//! - Per-speaker voice selection
//! - Chunking of long turns and rate-limit retry per request
//! - Sequential, in-order synthesis with partial-failure tolerance

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::audio_combiner::AudioCombiner;
use crate::chunk_splitter::{split_into_chunks, DEFAULT_MAX_CHUNK_CHARS};
use crate::error::TtsError;
use crate::retry::{duration_ms, synthesize_with_retry, RetryPolicy};
use crate::script_segmenter::Segment;
use crate::voice::{AudioConfig, VoiceProfile, VoiceTable};

// ============================================================================
// TRAIT DEFINITIONS
// ============================================================================

/// One TTS request: text in, base64 audio out
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        audio_config: &AudioConfig,
    ) -> Result<String, TtsError>;

    /// Get engine name
    fn engine_name(&self) -> &str;
}

#[async_trait]
impl<S: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<S> {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        audio_config: &AudioConfig,
    ) -> Result<String, TtsError> {
        (**self).synthesize(text, voice, audio_config).await
    }

    fn engine_name(&self) -> &str {
        (**self).engine_name()
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Synthesis policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Runaway guard: speech segments attempted per episode
    pub max_segments: usize,
    /// Character limit of a single TTS request
    pub chunk_max_chars: usize,
    /// Appended to every turn to leave a trailing pause
    pub pause_suffix: String,
    /// Wait between consecutive chunk requests of one turn
    #[serde(with = "duration_ms")]
    pub inter_chunk_delay: Duration,
    /// Wait between consecutive speech segments
    #[serde(with = "duration_ms")]
    pub inter_segment_delay: Duration,
    pub retry: RetryPolicy,
    pub voices: VoiceTable,
    pub audio: AudioConfig,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_segments: 500,
            chunk_max_chars: DEFAULT_MAX_CHUNK_CHARS,
            pause_suffix: "...".to_string(),
            inter_chunk_delay: Duration::from_millis(1000),
            inter_segment_delay: Duration::ZERO,
            retry: RetryPolicy::default(),
            voices: VoiceTable::default(),
            audio: AudioConfig::default(),
        }
    }
}

// ============================================================================
// BATCH SYNTHESIZER
// ============================================================================

/// Sequential segment synthesizer
pub struct BatchSynthesizer<S: SpeechSynthesizer> {
    engine: S,
    config: SynthesisConfig,
    combiner: AudioCombiner,
}

impl<S: SpeechSynthesizer> BatchSynthesizer<S> {
    pub fn new(engine: S, config: SynthesisConfig) -> Self {
        Self {
            engine,
            config,
            combiner: AudioCombiner::new(),
        }
    }

    pub fn engine(&self) -> &S {
        &self.engine
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesize `text` chunk by chunk, one retried request per chunk.
    /// Returns the chunk payloads in order; fails on the first chunk error.
    pub async fn synthesize_chunks(
        &self,
        text: &str,
        voice: &VoiceProfile,
        audio_config: &AudioConfig,
    ) -> Result<Vec<String>, TtsError> {
        let chunks = split_into_chunks(text, self.config.chunk_max_chars);
        if chunks.is_empty() {
            return Err(TtsError::EmptyText);
        }

        log::debug!(
            "Synthesizing {} chars in {} chunks with voice '{}'",
            text.chars().count(),
            chunks.len(),
            voice.name
        );

        let mut audio_chunks = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !self.config.inter_chunk_delay.is_zero() {
                tokio::time::sleep(self.config.inter_chunk_delay).await;
            }

            let audio = synthesize_with_retry(&self.config.retry, || {
                self.engine.synthesize(chunk, voice, audio_config)
            })
            .await?;

            log::debug!("Generated audio for chunk {}/{}", i + 1, chunks.len());
            audio_chunks.push(audio);
        }

        Ok(audio_chunks)
    }

    /// Synthesize free text with one voice into a single payload
    pub async fn synthesize_text(
        &self,
        text: &str,
        voice: &VoiceProfile,
        audio_config: &AudioConfig,
    ) -> Result<String, TtsError> {
        let mut chunks = self.synthesize_chunks(text, voice, audio_config).await?;
        if chunks.len() == 1 {
            return Ok(chunks.remove(0));
        }

        let attempted = chunks.len();
        self.combiner
            .combine(&chunks)
            .into_base64()
            .ok_or(TtsError::NoAudioProduced {
                attempted,
                last_error: None,
            })
    }

    /// Synthesize every speech segment, in order, into one episode track.
    ///
    /// Sound markers are skipped. A segment that fails is logged and left
    /// out; only an episode with no audio at all is an error.
    pub async fn synthesize_episode_audio(&self, segments: &[Segment]) -> Result<String, TtsError> {
        let mut buffers: Vec<String> = Vec::new();
        let mut attempted = 0usize;
        let mut last_error: Option<TtsError> = None;

        for segment in segments {
            let (speaker, text) = match segment {
                Segment::Speech { speaker, text } => (speaker, text),
                Segment::Sound { text } => {
                    log::debug!("Skipping sound effect: {}", text);
                    continue;
                }
            };

            if attempted >= self.config.max_segments {
                log::warn!(
                    "Limiting to {} segments, remaining script is not voiced",
                    self.config.max_segments
                );
                break;
            }

            if attempted > 0 && !self.config.inter_segment_delay.is_zero() {
                tokio::time::sleep(self.config.inter_segment_delay).await;
            }
            attempted += 1;

            let voice = self.config.voices.resolve(speaker);
            let text_with_pause = format!("{}{}", text, self.config.pause_suffix);
            let label = if speaker.is_empty() { "unknown" } else { speaker.as_str() };

            match self
                .synthesize_chunks(&text_with_pause, voice, &self.config.audio)
                .await
            {
                Ok(chunks) => {
                    log::debug!("Generated audio for segment by {}", label);
                    buffers.extend(chunks);
                }
                Err(e) => {
                    log::error!(
                        "Error generating audio for segment by {} ({}): {}",
                        label,
                        truncate_text(text, 50),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        if buffers.is_empty() {
            return Err(TtsError::NoAudioProduced {
                attempted,
                last_error: last_error.map(Box::new),
            });
        }

        log::info!(
            "Merging {} audio buffers from {} speech segments",
            buffers.len(),
            attempted
        );

        self.combiner
            .combine(&buffers)
            .into_base64()
            .ok_or(TtsError::NoAudioProduced {
                attempted,
                last_error: None,
            })
    }
}

/// Truncate text to preview length
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ============================================================================
// MOCK TTS ENGINE
// ============================================================================

/// MPEG-1 Layer III frame sync header the mock prefixes every payload with
const MOCK_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

/// Offline engine for dry runs: returns a fake MP3 frame carrying the text
#[derive(Debug, Clone, Default)]
pub struct MockSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        _audio_config: &AudioConfig,
    ) -> Result<String, TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let mut bytes = MOCK_FRAME_HEADER.to_vec();
        bytes.extend_from_slice(text.as_bytes());

        log::debug!(
            "MockSpeechSynthesizer: {} chars with voice '{}' -> {} bytes",
            text.len(),
            voice.name,
            bytes.len()
        );

        Ok(STANDARD.encode(bytes))
    }

    fn engine_name(&self) -> &str {
        "mock-tts"
    }
}

// ============================================================================
// TESTS
// ============================================================================
