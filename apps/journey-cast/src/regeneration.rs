//! On-demand audio regeneration with at most one in-flight synthesis per
//! episode.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::episode::{Episode, EpisodeStatus};
use crate::episode_pipeline::EpisodePipeline;
use crate::tts_batch::SpeechSynthesizer;

/// Set of episode keys with a synthesis in flight
#[derive(Debug, Clone, Default)]
pub struct RegenerationGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl RegenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if another run holds it
    pub fn try_acquire(&self, key: &str) -> Option<InFlightTicket> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(key.to_string()) {
            return None;
        }
        Some(InFlightTicket {
            key: key.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains(key)
    }
}

/// Held for the duration of one regeneration; releases its key on drop
#[derive(Debug)]
pub struct InFlightTicket {
    key: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl InFlightTicket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// Result of a regeneration request
#[derive(Debug, Clone, PartialEq)]
pub enum RegenerateOutcome {
    /// The episode still carries audio; nothing was synthesized
    AlreadyHasAudio,
    /// Another request for the same key is running; nothing was synthesized
    AlreadyInFlight,
    /// Synthesis ran; the episode is `ready` or `failed`
    Finished(Episode),
}

/// Key for an episode inside a journey
pub fn episode_key(journey_id: &str, index: usize) -> String {
    format!("{}#{}", journey_id, index)
}

/// Re-synthesize an episode whose audio was dropped.
///
/// Overlapping requests for the same `key` are rejected rather than run
/// twice.
pub async fn regenerate_episode<S: SpeechSynthesizer>(
    pipeline: &EpisodePipeline<S>,
    guard: &RegenerationGuard,
    key: &str,
    mut episode: Episode,
) -> RegenerateOutcome {
    if episode.has_audio() {
        return RegenerateOutcome::AlreadyHasAudio;
    }

    let Some(_ticket) = guard.try_acquire(key) else {
        log::info!("Regeneration for {} already in progress, skipping", key);
        return RegenerateOutcome::AlreadyInFlight;
    };

    log::info!("Regenerating audio for \"{}\" ({})", episode.title, key);
    episode.status = EpisodeStatus::Processing;

    let finished = pipeline.generate_podcast(episode).await;
    match finished.status {
        EpisodeStatus::Ready => log::info!("Regenerated audio for {}", key),
        status => log::warn!("Regeneration for {} ended {}", key, status),
    }

    RegenerateOutcome::Finished(finished)
}
