//! Error types shared by the synthesis, pipeline and persistence layers.

use thiserror::Error;

/// Errors raised while turning text into audio.
#[derive(Debug, Clone, Error)]
pub enum TtsError {
    /// Nothing to synthesize after trimming
    #[error("Text is empty")]
    EmptyText,

    /// The TTS endpoint answered with a non-success status
    #[error("TTS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced an HTTP response
    #[error("TTS transport error: {0}")]
    Transport(String),

    /// The endpoint answered 2xx but the body was unusable
    #[error("Invalid TTS response: {0}")]
    InvalidResponse(String),

    /// Every speech segment of an episode failed or was skipped
    #[error("No audio segments were successfully generated ({attempted} attempted)")]
    NoAudioProduced {
        attempted: usize,
        last_error: Option<Box<TtsError>>,
    },

    /// Component construction failed (bad pattern, bad config)
    #[error("Setup error: {0}")]
    Setup(String),

    /// The caller stopped the operation before it finished
    #[error("Synthesis cancelled")]
    Cancelled,
}

impl TtsError {
    /// True for upstream throttling: HTTP 429, or HTTP 403 whose message
    /// mentions "quota". An episode that produced no audio is throttled
    /// when the last segment failure was.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            TtsError::Api { status: 429, .. } => true,
            TtsError::Api {
                status: 403,
                message,
            } => message.contains("quota"),
            TtsError::NoAudioProduced {
                last_error: Some(err),
                ..
            } => err.is_rate_limited(),
            _ => false,
        }
    }
}

/// Why an episode ended up `failed`.
#[derive(Debug, Clone, Error)]
pub enum EpisodeError {
    #[error("Missing script content")]
    MissingScript,

    #[error("Unrecognized script shape: {0}")]
    UnrecognizedScript(String),

    #[error(transparent)]
    Synthesis(#[from] TtsError),

    #[error("Fallback audio failed ({fallback}) after: {primary}")]
    Fallback {
        primary: TtsError,
        fallback: TtsError,
    },
}

/// Journey persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Journey not found: {0}")]
    NotFound(String),

    #[error("Cannot determine config directory")]
    NoConfigDir,
}

/// Content-generation failures.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Generation API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation transport error: {0}")]
    Transport(String),

    #[error("Failed to parse podcast content: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> TtsError {
        TtsError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(api(429, "Too Many Requests").is_rate_limited());
        assert!(api(403, "Resource has been exhausted (e.g. check quota).").is_rate_limited());
        assert!(!api(403, "The caller does not have permission").is_rate_limited());
        assert!(!api(401, "quota").is_rate_limited());
        assert!(!api(500, "Internal").is_rate_limited());
        assert!(!TtsError::Transport("connection reset".into()).is_rate_limited());
    }

    #[test]
    fn test_no_audio_inherits_last_error_class() {
        let throttled = TtsError::NoAudioProduced {
            attempted: 2,
            last_error: Some(Box::new(api(429, "slow down"))),
        };
        assert!(throttled.is_rate_limited());

        let broken = TtsError::NoAudioProduced {
            attempted: 2,
            last_error: Some(Box::new(api(400, "bad voice"))),
        };
        assert!(!broken.is_rate_limited());

        let empty = TtsError::NoAudioProduced {
            attempted: 0,
            last_error: None,
        };
        assert!(!empty.is_rate_limited());
    }
}
