//! Bounded in-memory cache of synthesized speech, keyed by a SHA-256 of
//! the voice and text.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::error::TtsError;
use crate::tts_batch::SpeechSynthesizer;
use crate::voice::{AudioConfig, VoiceProfile};

pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Content hash for one request. Returns a 64-character hex string.
pub fn speech_key(voice: &VoiceProfile, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(voice.language_code.as_bytes());
    hasher.update([0u8]);
    hasher.update(voice.name.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, String>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

/// Capacity-capped map; inserting past capacity evicts the oldest entry
#[derive(Debug)]
pub struct SpeechCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for SpeechCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl SpeechCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, audio: String) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.state.lock();
        if state.entries.insert(key.clone(), audio).is_some() {
            return;
        }
        state.order.push_back(key);

        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                log::debug!("Evicted cached speech {}", &oldest[..oldest.len().min(12)]);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}

/// Serves repeated requests from a [`SpeechCache`]
pub struct CachingSynthesizer<S: SpeechSynthesizer> {
    inner: S,
    cache: SpeechCache,
}

impl<S: SpeechSynthesizer> CachingSynthesizer<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            cache: SpeechCache::new(capacity),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &SpeechCache {
        &self.cache
    }
}

#[async_trait]
impl<S: SpeechSynthesizer> SpeechSynthesizer for CachingSynthesizer<S> {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        audio_config: &AudioConfig,
    ) -> Result<String, TtsError> {
        let key = speech_key(voice, text);
        if let Some(audio) = self.cache.get(&key) {
            log::debug!("Using cached audio for {} chars", text.len());
            return Ok(audio);
        }

        let audio = self.inner.synthesize(text, voice, audio_config).await?;
        self.cache.insert(key, audio.clone());
        Ok(audio)
    }

    fn engine_name(&self) -> &str {
        self.inner.engine_name()
    }
}
