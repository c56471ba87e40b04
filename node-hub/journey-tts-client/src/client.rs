//! HTTP clients for the speech-synthesis and script-generation endpoints.

use std::time::Duration;

use async_trait::async_trait;
use eyre::WrapErr;
use journey_cast::{
    build_generation_prompt, parse_generated_episodes, AudioConfig, Episode, GenerationError,
    JourneyRequest, ScriptGenerator, SpeechSynthesizer, TtsError, VoiceProfile,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{get_env_or_value, mask_secret, GenerationConfig, TtsConfig};

/// Shared client construction; proxies from the environment are only
/// honored when `proxy` is set
fn build_http_client(timeout: Duration, proxy: bool) -> eyre::Result<HttpClient> {
    let builder = HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30));
    let builder = if proxy { builder } else { builder.no_proxy() };
    builder.build().wrap_err("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// `error.message` of a Google-style error payload, else the raw body
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// SPEECH SYNTHESIS
// ============================================================================

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: &'a VoiceProfile,
    audio_config: &'a AudioConfig,
}

impl<'a> SynthesizeRequest<'a> {
    pub(crate) fn new(text: &'a str, voice: &'a VoiceProfile, audio_config: &'a AudioConfig) -> Self {
        Self {
            input: SynthesisInput { text },
            voice,
            audio_config,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

pub(crate) fn parse_synthesize_response(body: &str) -> Result<String, TtsError> {
    let response: SynthesizeResponse = serde_json::from_str(body)
        .map_err(|e| TtsError::InvalidResponse(format!("Failed to parse TTS response: {}", e)))?;

    match response.audio_content {
        Some(audio) if !audio.is_empty() => Ok(audio),
        _ => Err(TtsError::InvalidResponse(
            "No audio content received from TTS API".to_string(),
        )),
    }
}

/// Google Cloud-style `text:synthesize` client
#[derive(Debug)]
pub struct GoogleTtsClient {
    api_key: String,
    api_url: String,
    client: HttpClient,
}

impl GoogleTtsClient {
    pub fn new(config: &TtsConfig) -> eyre::Result<Self> {
        let api_key = get_env_or_value(&config.api_key);
        if api_key.is_empty() {
            eyre::bail!("TTS API key is not configured (tts.api_key)");
        }
        tracing::info!("TTS endpoint {} with key {}", config.api_url, mask_secret(&api_key));

        Ok(Self {
            api_key,
            api_url: get_env_or_value(&config.api_url),
            client: build_http_client(
                Duration::from_secs(config.request_timeout_secs),
                config.proxy,
            )?,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        audio_config: &AudioConfig,
    ) -> Result<String, TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("X-goog-api-key", &self.api_key)
            .json(&SynthesizeRequest::new(text, voice, audio_config))
            .send()
            .await
            .map_err(|e| TtsError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TtsError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            tracing::warn!("TTS request failed with {}: {}", status, message);
            return Err(TtsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!("TTS request for {} chars succeeded", text.chars().count());
        parse_synthesize_response(&body)
    }

    fn engine_name(&self) -> &str {
        "google-tts"
    }
}

// ============================================================================
// SCRIPT GENERATION
// ============================================================================

pub(crate) fn generation_body(prompt: &str, temperature: f32, max_output_tokens: u32) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "temperature": temperature,
            "maxOutputTokens": max_output_tokens,
        }
    })
}

/// `candidates[0].content.parts[0].text`
pub(crate) fn candidate_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

/// Gemini-style `generateContent` client
#[derive(Debug)]
pub struct GeminiScriptClient {
    api_key: String,
    api_url: String,
    temperature: f32,
    max_output_tokens: u32,
    client: HttpClient,
}

impl GeminiScriptClient {
    pub fn new(config: &GenerationConfig) -> eyre::Result<Self> {
        let api_key = get_env_or_value(&config.api_key);
        if api_key.is_empty() {
            eyre::bail!("Generation API key is not configured (generation.api_key)");
        }
        tracing::info!(
            "Generation endpoint {} with key {}",
            config.api_url,
            mask_secret(&api_key)
        );

        Ok(Self {
            api_key,
            api_url: get_env_or_value(&config.api_url),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client: build_http_client(
                Duration::from_secs(config.request_timeout_secs),
                config.proxy,
            )?,
        })
    }
}

#[async_trait]
impl ScriptGenerator for GeminiScriptClient {
    async fn generate_episodes(&self, request: &JourneyRequest) -> Result<Vec<Episode>, GenerationError> {
        tracing::info!(
            "Generating podcast content for topic: {}, episodes: {}",
            request.topic,
            request.episode_count
        );

        let prompt = build_generation_prompt(request);
        let response = self
            .client
            .post(&self.api_url)
            .header("X-goog-api-key", &self.api_key)
            .json(&generation_body(&prompt, self.temperature, self.max_output_tokens))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        let text = candidate_text(&value).ok_or_else(|| {
            GenerationError::MalformedResponse("response has no candidate text".to_string())
        })?;

        let episodes = parse_generated_episodes(text)?;
        for episode in &episodes {
            tracing::debug!(
                "Generated \"{}\" ({} script chars)",
                episode.title,
                episode
                    .script
                    .as_ref()
                    .and_then(|s| s.normalize(&episode.title).ok())
                    .map_or(0, |s| s.chars().count())
            );
        }
        tracing::info!("Successfully generated {} episodes", episodes.len());
        Ok(episodes)
    }

    fn generator_name(&self) -> &str {
        "gemini"
    }
}
