//! Episode Pipeline - Turn generated episodes into playable audio records
//!
//! This module provides:
//! - Script normalization ahead of segmentation
//! - Per-episode state machine (`generating` → `ready` | `failed`)
//! - Placeholder narration when upstream throttling blocks full synthesis
//! - Strictly sequential batch processing with an inter-episode delay
//! - Progress reporting and between-episode cancellation

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::audio_combiner::to_data_uri;
use crate::episode::{Episode, EpisodeStatus};
use crate::error::{EpisodeError, TtsError};
use crate::retry::duration_ms;
use crate::script_segmenter::ScriptSegmenter;
use crate::tts_batch::{BatchSynthesizer, SpeechSynthesizer, SynthesisConfig};
use crate::voice::VoiceProfile;

const UNKNOWN_TITLE: &str = "Unknown Episode";

// ============================================================================
// DATA MODELS
// ============================================================================

/// Pipeline policy; delays are tuned against the upstream quota
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub synthesis: SynthesisConfig,
    /// Wait between consecutive episodes of a batch
    #[serde(with = "duration_ms")]
    pub inter_episode_delay: Duration,
    /// Wait before the placeholder attempt in batch mode
    #[serde(with = "duration_ms")]
    pub fallback_cooldown: Duration,
    pub fallback_voice: VoiceProfile,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            synthesis: SynthesisConfig::default(),
            inter_episode_delay: Duration::from_millis(5000),
            fallback_cooldown: Duration::from_millis(10000),
            fallback_voice: VoiceProfile::announcer(),
        }
    }
}

/// Progress update after each finished episode
#[derive(Debug, Clone)]
pub struct PipelineProgress {
    /// Episodes finished so far
    pub completed: usize,
    pub total: usize,
    pub title: String,
    pub status: EpisodeStatus,
    /// Percentage complete (0-100)
    pub percentage: f64,
}

/// Progress callback type
pub type ProgressCallback = Arc<Mutex<Box<dyn Fn(PipelineProgress) + Send + Sync>>>;

/// Wrap a closure as a [`ProgressCallback`]
pub fn progress_callback(f: impl Fn(PipelineProgress) + Send + Sync + 'static) -> ProgressCallback {
    Arc::new(Mutex::new(Box::new(f)))
}

/// Text narrated in place of an episode that could not be synthesized
pub fn fallback_announcement(title: &str) -> String {
    format!(
        "This is a podcast episode titled: {}. Due to high demand, the full audio will be available shortly.",
        title
    )
}

// ============================================================================
// EPISODE PIPELINE
// ============================================================================

/// Top-level orchestrator; the sole writer of an episode's audio fields
/// during its own run
pub struct EpisodePipeline<S: SpeechSynthesizer> {
    synthesizer: BatchSynthesizer<S>,
    segmenter: ScriptSegmenter,
    inter_episode_delay: Duration,
    fallback_cooldown: Duration,
    fallback_voice: VoiceProfile,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl<S: SpeechSynthesizer> EpisodePipeline<S> {
    pub fn new(engine: S, config: PipelineConfig) -> Result<Self, TtsError> {
        Ok(Self {
            synthesizer: BatchSynthesizer::new(engine, config.synthesis),
            segmenter: ScriptSegmenter::new()?,
            inter_episode_delay: config.inter_episode_delay,
            fallback_cooldown: config.fallback_cooldown,
            fallback_voice: config.fallback_voice,
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops a running batch before its next episode
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn synthesizer(&self) -> &BatchSynthesizer<S> {
        &self.synthesizer
    }

    /// Synthesize a batch, one episode at a time, in input order.
    ///
    /// Every input yields exactly one output record. Per-episode failures
    /// become `failed` records and never abort the batch. After
    /// cancellation the remaining episodes are returned unchanged.
    pub async fn generate_audio_for_episodes(&self, episodes: Vec<Episode>) -> Vec<Episode> {
        let total = episodes.len();
        if total == 0 {
            log::warn!("No episodes provided for audio generation");
            return Vec::new();
        }

        log::info!("Generating audio for {} episode(s) sequentially", total);

        let mut results = Vec::with_capacity(total);
        let mut pending = episodes.into_iter();

        while let Some(episode) = pending.next() {
            if self.cancel.is_cancelled() {
                log::warn!(
                    "Audio generation cancelled, {} episode(s) left untouched",
                    total - results.len()
                );
                results.push(episode);
                results.extend(pending);
                break;
            }

            let finished = self.process_episode(episode, self.fallback_cooldown).await;
            self.report(results.len() + 1, total, &finished);
            results.push(finished);

            if results.len() < total && !self.inter_episode_delay.is_zero() {
                log::info!(
                    "Episode completed, waiting {}ms before the next one",
                    self.inter_episode_delay.as_millis()
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.inter_episode_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        results
    }

    /// Synthesize one episode immediately; no inter-episode pacing or
    /// fallback cooldown applies here.
    pub async fn generate_podcast(&self, episode: Episode) -> Episode {
        self.process_episode(episode, Duration::ZERO).await
    }

    async fn process_episode(&self, mut episode: Episode, fallback_cooldown: Duration) -> Episode {
        let title = if episode.title.trim().is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            episode.title.clone()
        };
        log::info!("Processing audio for episode \"{}\"", title);
        episode.status = EpisodeStatus::Generating;

        let audio = match self.synthesize_script(&episode, &title).await {
            Ok(audio) => audio,
            Err(EpisodeError::Synthesis(primary)) if primary.is_rate_limited() => {
                log::warn!(
                    "Rate limited while generating \"{}\" ({}), trying placeholder audio",
                    title,
                    primary
                );
                if !fallback_cooldown.is_zero() {
                    tokio::time::sleep(fallback_cooldown).await;
                }

                match self.synthesize_fallback(&title).await {
                    Ok(audio) => {
                        log::info!("Generated placeholder audio for \"{}\"", title);
                        episode.mark_ready(to_data_uri(&audio), true);
                    }
                    Err(fallback) => {
                        log::error!("Placeholder audio for \"{}\" failed: {}", title, fallback);
                        episode.mark_failed(EpisodeError::Fallback { primary, fallback });
                    }
                }
                return episode;
            }
            Err(e) => {
                log::error!("Audio generation for \"{}\" failed: {}", title, e);
                episode.mark_failed(e);
                return episode;
            }
        };

        episode.mark_ready(to_data_uri(&audio), false);
        log::info!("Audio ready for episode \"{}\"", title);
        episode
    }

    /// Normalize, segment and synthesize an episode's script to base64 audio
    async fn synthesize_script(&self, episode: &Episode, title: &str) -> Result<String, EpisodeError> {
        let script = episode.script.as_ref().ok_or(EpisodeError::MissingScript)?;
        let text = script.normalize(title)?;
        let segments = self.segmenter.segment(&text);

        log::debug!(
            "Script for \"{}\": {} chars, {} segments",
            title,
            text.chars().count(),
            segments.len()
        );

        Ok(self.synthesizer.synthesize_episode_audio(&segments).await?)
    }

    async fn synthesize_fallback(&self, title: &str) -> Result<String, TtsError> {
        let audio_config = &self.synthesizer.config().audio;
        self.synthesizer
            .synthesize_text(&fallback_announcement(title), &self.fallback_voice, audio_config)
            .await
    }

    fn report(&self, completed: usize, total: usize, episode: &Episode) {
        if let Some(progress) = &self.progress {
            let callback = progress.lock();
            callback(PipelineProgress {
                completed,
                total,
                title: episode.title.clone(),
                status: episode.status,
                percentage: (completed as f64 / total as f64) * 100.0,
            });
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_combiner::{parse_data_uri, DATA_URI_PREFIX};
    use crate::tts_batch::tests::{api, fast_config, FakeEngine};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::json;
    use tokio::time::Instant;

    const SCRIPT: &str =
        "[Intro Music]\n**Host:** Welcome to the show.\n**Speaker:** Thanks for having me.";

    fn config() -> PipelineConfig {
        PipelineConfig {
            synthesis: fast_config(),
            ..Default::default()
        }
    }

    fn quota_unless_fallback() -> FakeEngine {
        FakeEngine::new(|text, _| {
            if text.starts_with("This is a podcast episode titled") {
                Ok(text.as_bytes().to_vec())
            } else {
                Err(api(403, "Quota exceeded for quota metric"))
            }
        })
    }

    fn audio_bytes(episode: &Episode) -> Vec<u8> {
        let uri = episode.audio_url.as_deref().unwrap();
        STANDARD.decode(parse_data_uri(uri).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_two_speaker_script_becomes_ready() {
        let pipeline = EpisodePipeline::new(FakeEngine::echo(), config()).unwrap();
        let episode = Episode::new("Welcome", "Pilot").with_script(SCRIPT);

        let result = pipeline.generate_podcast(episode).await;

        assert_eq!(result.status, EpisodeStatus::Ready);
        assert!(result.had_audio);
        assert!(!result.is_fallback_audio);
        assert!(result.audio_url.as_deref().unwrap().starts_with(DATA_URI_PREFIX));
        assert_eq!(pipeline.synthesizer().engine().call_count(), 2);
        assert_eq!(
            audio_bytes(&result),
            b"Welcome to the show....Thanks for having me....".to_vec()
        );
    }

    #[tokio::test]
    async fn test_non_rate_limit_failure_marks_failed() {
        let engine = FakeEngine::new(|_, _| Err(api(401, "API key not valid")));
        let pipeline = EpisodePipeline::new(engine, config()).unwrap();

        let result = pipeline
            .generate_podcast(Episode::new("Ep", "").with_script(SCRIPT))
            .await;

        assert_eq!(result.status, EpisodeStatus::Failed);
        assert!(!result.had_audio);
        assert!(result.audio_url.is_none());
        assert!(result.error.is_some());
        // No placeholder attempt after an auth failure
        assert_eq!(pipeline.synthesizer().engine().call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_failure_uses_placeholder_audio() {
        let pipeline = EpisodePipeline::new(quota_unless_fallback(), config()).unwrap();
        let started = Instant::now();

        let results = pipeline
            .generate_audio_for_episodes(vec![Episode::new("Lifetimes", "").with_script(SCRIPT)])
            .await;

        let result = &results[0];
        assert_eq!(result.status, EpisodeStatus::Ready);
        assert!(result.is_fallback_audio);
        assert!(result.had_audio);
        assert_eq!(
            audio_bytes(result),
            fallback_announcement("Lifetimes").into_bytes()
        );
        assert!(started.elapsed() >= Duration::from_millis(10000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_entry_skips_fallback_cooldown() {
        let pipeline = EpisodePipeline::new(quota_unless_fallback(), config()).unwrap();
        let started = Instant::now();

        let result = pipeline
            .generate_podcast(Episode::new("Traits", "").with_script(SCRIPT))
            .await;

        assert!(result.is_fallback_audio);
        assert!(started.elapsed() < Duration::from_millis(10000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_placeholder_marks_failed() {
        let engine = FakeEngine::new(|_, _| Err(api(429, "Too Many Requests")));
        let pipeline = EpisodePipeline::new(engine, config()).unwrap();

        let result = pipeline
            .generate_podcast(Episode::new("Ep", "").with_script(SCRIPT))
            .await;

        assert_eq!(result.status, EpisodeStatus::Failed);
        assert!(!result.had_audio);
        assert!(!result.is_fallback_audio);
        assert!(result.error.unwrap().contains("Fallback audio failed"));
    }

    #[tokio::test]
    async fn test_missing_script_does_not_abort_batch() {
        let pipeline = EpisodePipeline::new(
            FakeEngine::echo(),
            PipelineConfig {
                inter_episode_delay: Duration::ZERO,
                ..config()
            },
        )
        .unwrap();

        let results = pipeline
            .generate_audio_for_episodes(vec![
                Episode::new("No script", ""),
                Episode::new("Scalar", "").with_script(
                    serde_json::from_value::<crate::ScriptSource>(json!(42)).unwrap(),
                ),
                Episode::new("Good", "").with_script("**Host:** Fine."),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, EpisodeStatus::Failed);
        assert_eq!(results[0].error.as_deref(), Some("Missing script content"));
        assert_eq!(results[1].status, EpisodeStatus::Failed);
        assert_eq!(results[2].status, EpisodeStatus::Ready);
        assert_eq!(pipeline.synthesizer().engine().call_count(), 1);
    }

    #[tokio::test]
    async fn test_turn_list_script_is_normalized() {
        let pipeline = EpisodePipeline::new(FakeEngine::echo(), config()).unwrap();
        let script: crate::ScriptSource = serde_json::from_value(json!([
            {"soundEffect": "Intro Music"},
            {"speaker": "Host", "line": "Hello."},
            {"speaker": "Guest", "text": "Hi there."}
        ]))
        .unwrap();

        let result = pipeline
            .generate_podcast(Episode::new("Turns", "").with_script(script))
            .await;

        assert_eq!(result.status, EpisodeStatus::Ready);
        let engine = pipeline.synthesizer().engine();
        assert_eq!(engine.texts(), vec!["Hello....", "Hi there...."]);
        let voices: Vec<String> = engine.calls.lock().iter().map(|c| c.voice.clone()).collect();
        assert_eq!(voices, vec!["en-US-Chirp3-HD-Achird", "en-US-Neural2-C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_is_paced_and_ordered() {
        let pipeline = EpisodePipeline::new(FakeEngine::echo(), config()).unwrap();
        let started = Instant::now();

        let results = pipeline
            .generate_audio_for_episodes(
                (1..=3)
                    .map(|i| Episode::new(format!("Ep {}", i), "").with_script(format!("**Host:** Part {}.", i)))
                    .collect(),
            )
            .await;

        let titles: Vec<&str> = results.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Ep 1", "Ep 2", "Ep 3"]);
        assert!(results.iter().all(|e| e.status == EpisodeStatus::Ready));
        assert_eq!(
            pipeline.synthesizer().engine().texts(),
            vec!["Part 1....", "Part 2....", "Part 3...."]
        );
        // Two gaps of 5s; none after the last episode
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(10000));
        assert!(elapsed < Duration::from_millis(15000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_episodes() {
        let token = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let progress = {
            let token = token.clone();
            let seen = seen.clone();
            progress_callback(move |update: PipelineProgress| {
                seen.lock().push((update.completed, update.total, update.status));
                token.cancel();
            })
        };
        let pipeline = EpisodePipeline::new(FakeEngine::echo(), config())
            .unwrap()
            .with_progress(progress)
            .with_cancellation(token);

        let results = pipeline
            .generate_audio_for_episodes(vec![
                Episode::new("First", "").with_script("**Host:** One."),
                Episode::new("Second", "").with_script("**Host:** Two."),
                Episode::new("Third", "").with_script("**Host:** Three."),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, EpisodeStatus::Ready);
        assert_eq!(results[1].status, EpisodeStatus::Pending);
        assert_eq!(results[2].status, EpisodeStatus::Pending);
        assert_eq!(*seen.lock(), vec![(1, 3, EpisodeStatus::Ready)]);
        assert_eq!(pipeline.synthesizer().engine().call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pipeline = EpisodePipeline::new(FakeEngine::echo(), config()).unwrap();
        assert!(pipeline.generate_audio_for_episodes(Vec::new()).await.is_empty());
    }
}
