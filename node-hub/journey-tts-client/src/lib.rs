//! Journey TTS Client - network collaborators for journey-cast
//!
//! - Google-style speech synthesis over HTTP
//! - Gemini-style script generation over HTTP
//! - Layered configuration (file + `JOURNEY_` environment)
//! - Export of finished episode audio

pub mod client;
pub mod config;
pub mod export;

pub use client::{GeminiScriptClient, GoogleTtsClient};
pub use config::{get_env_or_value, mask_secret, Config, PipelineSettings};
pub use export::{episode_file_name, export_episode_audio, slugify};
