//! Episode record shared by the generator, the pipeline and the store.

use serde::{Deserialize, Serialize};

use crate::script_source::ScriptSource;

/// Lifecycle of one episode's audio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    #[default]
    Pending,
    Generating,
    Processing,
    Ready,
    Failed,
}

impl EpisodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeStatus::Pending => "pending",
            EpisodeStatus::Generating => "generating",
            EpisodeStatus::Processing => "processing",
            EpisodeStatus::Ready => "ready",
            EpisodeStatus::Failed => "failed",
        }
    }

    /// No synthesis is running for the episode
    pub fn is_settled(&self) -> bool {
        matches!(self, EpisodeStatus::Ready | EpisodeStatus::Failed)
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated script plus its synthesized audio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptSource>,
    /// `data:audio/mp3;base64,...` once synthesis succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub status: EpisodeStatus,
    /// Audio was produced at least once, even if the URL was since dropped
    #[serde(default)]
    pub had_audio: bool,
    /// The audio is the "available shortly" placeholder
    #[serde(default)]
    pub is_fallback_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Episode {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_script(mut self, script: impl Into<ScriptSource>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Audio existed once but the payload is gone (typically after a
    /// store round-trip); synthesize again on demand.
    pub fn needs_regeneration(&self) -> bool {
        self.had_audio && self.audio_url.is_none()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_url.is_some()
    }

    pub(crate) fn mark_ready(&mut self, audio_url: String, is_fallback: bool) {
        self.audio_url = Some(audio_url);
        self.status = EpisodeStatus::Ready;
        self.had_audio = true;
        self.is_fallback_audio = is_fallback;
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, error: impl ToString) {
        self.audio_url = None;
        self.status = EpisodeStatus::Failed;
        self.had_audio = false;
        self.is_fallback_audio = false;
        self.error = Some(error.to_string());
    }
}
