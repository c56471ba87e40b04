//! Word-by-word text reveal paced to the estimated length of the spoken
//! audio. The task runs on the tokio runtime and stops on `cancel()`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::generation::WORDS_PER_MINUTE;

/// Estimated playback length of `text` at `speaking_rate` (1.0 = normal)
pub fn estimate_speech_duration(text: &str, speaking_rate: f32) -> Duration {
    let words = text.split_whitespace().count();
    let rate = if speaking_rate > 0.0 { speaking_rate } else { 1.0 };
    let words_per_second = WORDS_PER_MINUTE as f64 * rate as f64 / 60.0;
    Duration::from_secs_f64(words as f64 / words_per_second)
}

/// Revealed prefix and fraction of words shown
#[derive(Debug, Clone, PartialEq)]
pub struct RevealUpdate {
    pub text: String,
    pub progress: f64,
}

/// Handle to a running reveal
#[derive(Debug)]
pub struct RevealTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RevealTask {
    /// Start revealing `text`; updates arrive on the returned receiver.
    /// Must be called from within a tokio runtime.
    pub fn spawn(text: &str, speaking_rate: f32) -> (Self, mpsc::UnboundedReceiver<RevealUpdate>) {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let total = estimate_speech_duration(text, speaking_rate);
        let word_delay = if words.is_empty() {
            Duration::ZERO
        } else {
            total / words.len() as u32
        };

        log::debug!(
            "Starting text reveal for {} words over {}ms",
            words.len(),
            total.as_millis()
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut shown = String::new();

            for (i, word) in words.iter().enumerate() {
                let deadline = started + word_delay * i as u32;
                tokio::select! {
                    _ = task_token.cancelled() => {
                        log::debug!("Text reveal cancelled after {} words", i);
                        return;
                    }
                    _ = tokio::time::sleep_until(deadline) => {}
                }

                if i > 0 {
                    shown.push(' ');
                }
                shown.push_str(word);

                let update = RevealUpdate {
                    text: shown.clone(),
                    progress: (i + 1) as f64 / words.len() as f64,
                };
                if tx.send(update).is_err() {
                    return;
                }
            }
        });

        (
            Self {
                token,
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the reveal to end, by completion or cancellation
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Text reveal task failed: {}", e);
            }
        }
    }
}

impl Drop for RevealTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_estimate() {
        let text = vec!["word"; 150].join(" ");
        assert_eq!(estimate_speech_duration(&text, 1.0), Duration::from_secs(60));
        assert_eq!(estimate_speech_duration(&text, 2.0), Duration::from_secs(30));
        assert_eq!(estimate_speech_duration("", 1.0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveals_every_word_in_order() {
        let started = Instant::now();
        let (task, mut rx) = RevealTask::spawn("one two three four five", 1.0);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        task.join().await;

        let texts: Vec<&str> = updates.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["one", "one two", "one two three", "one two three four", "one two three four five"]
        );
        assert_eq!(updates.last().unwrap().progress, 1.0);
        // 5 words at 150 wpm = 2s; the last word shows at 4/5 of that
        assert!(started.elapsed() >= Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_reveal() {
        let (task, mut rx) = RevealTask::spawn("a b c d e f g h", 1.0);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, "a");

        task.cancel();
        task.join().await;

        let mut rest = 0;
        while rx.recv().await.is_some() {
            rest += 1;
        }
        assert!(rest < 7);
    }
}
