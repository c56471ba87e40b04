//! Journey Cast - Turn generated multi-speaker scripts into episode audio
//!
//! This crate provides:
//! - Script normalization and segmentation (`**Speaker:** text`, `[marker]`)
//! - Sentence-respecting chunking sized for one TTS request
//! - Rate-limit retry with exponential backoff
//! - In-order, partial-failure-tolerant synthesis into one track per episode
//! - Episode orchestration with placeholder narration under throttling
//! - Journey persistence without audio payloads, and single-flight regeneration
//!
//! **Note**: per-segment MP3 payloads are joined by byte concatenation, not
//! remuxed. The TTS and language-model endpoints are injected through the
//! [`SpeechSynthesizer`] and [`ScriptGenerator`] traits.

pub mod audio_combiner;
pub mod chunk_splitter;
pub mod episode;
pub mod episode_pipeline;
pub mod error;
pub mod generation;
pub mod journey_store;
pub mod regeneration;
pub mod retry;
pub mod reveal;
pub mod script_segmenter;
pub mod script_source;
pub mod speech_cache;
pub mod tts_batch;
pub mod voice;

// Re-export error types
pub use error::{EpisodeError, GenerationError, StoreError, TtsError};

// Re-export script types
pub use chunk_splitter::{split_into_chunks, split_sentences, DEFAULT_MAX_CHUNK_CHARS};
pub use script_segmenter::{ScriptSegmenter, Segment};
pub use script_source::{DialogueTurn, ScriptSource, ScriptTurn};

// Re-export synthesis types
pub use audio_combiner::{
    decode_base64, parse_data_uri, to_data_uri, write_audio_file, AudioCombiner, CombinedAudio,
    DATA_URI_PREFIX,
};
pub use retry::{synthesize_with_retry, RetryPolicy};
pub use speech_cache::{speech_key, CachingSynthesizer, SpeechCache, DEFAULT_CACHE_CAPACITY};
pub use tts_batch::{BatchSynthesizer, MockSpeechSynthesizer, SpeechSynthesizer, SynthesisConfig};
pub use voice::{AudioConfig, SsmlGender, VoiceProfile, VoiceTable};

// Re-export episode types
pub use episode::{Episode, EpisodeStatus};
pub use episode_pipeline::{
    fallback_announcement, progress_callback, EpisodePipeline, PipelineConfig, PipelineProgress,
    ProgressCallback,
};
pub use regeneration::{
    episode_key, regenerate_episode, InFlightTicket, RegenerateOutcome, RegenerationGuard,
};

// Re-export journey types
pub use generation::{
    build_generation_prompt, parse_generated_episodes, JourneyRequest, MockScriptGenerator,
    ScriptGenerator, WORDS_PER_MINUTE,
};
pub use journey_store::{strip_audio, FileJourneyStore, Journey, JourneyStore};
pub use reveal::{estimate_speech_duration, RevealTask, RevealUpdate};

pub use tokio_util::sync::CancellationToken;
