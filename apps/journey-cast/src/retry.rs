//! Exponential-backoff retry for rate-limited TTS calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TtsError;

/// Backoff settings for one API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for every retry after it
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry` (0-indexed): `initial_delay * 2^retry`
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Run `api_call`, retrying only rate-limited failures.
///
/// Every other error is returned after the first attempt. Once
/// `max_retries` retries are spent the last error is returned.
pub async fn synthesize_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut api_call: F,
) -> Result<T, TtsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TtsError>>,
{
    let mut retry = 0u32;
    loop {
        match api_call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                log::warn!(
                    "API rate limited. Retrying in {}ms (attempt {}/{})...",
                    delay.as_millis(),
                    retry + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
