use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use journey_cast::{PipelineConfig, RetryPolicy, SynthesisConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "JOURNEY_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "journey_config.toml";

/// Client configuration.
///
/// Loaded from a TOML/YAML/JSON file and `JOURNEY_`-prefixed environment
/// variables; nested keys use `__` (e.g. `JOURNEY_PIPELINE__MAX_RETRIES`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Journey store file; the user config directory when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tts: TtsConfig::default(),
            generation: GenerationConfig::default(),
            pipeline: PipelineSettings::default(),
            cache: CacheSettings::default(),
            log_level: default_log_level(),
            output_dir: default_output_dir(),
            store_path: None,
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./journey-output")
}

/// Speech-synthesis endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_url")]
    pub api_url: String,
    /// Literal key or `env:VAR_NAME`
    #[serde(default = "default_tts_key")]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub proxy: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_url: default_tts_url(),
            api_key: default_tts_key(),
            request_timeout_secs: default_request_timeout(),
            proxy: false,
        }
    }
}

fn default_tts_url() -> String {
    "https://texttospeech.googleapis.com/v1/text:synthesize".to_string()
}

fn default_tts_key() -> String {
    "env:GOOGLE_TTS_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Script-generation endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub api_url: String,
    #[serde(default = "default_generation_key")]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_generation_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub proxy: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_generation_url(),
            api_key: default_generation_key(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_generation_timeout(),
            proxy: false,
        }
    }
}

fn default_generation_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        .to_string()
}

fn default_generation_key() -> String {
    "env:GEMINI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_output_tokens() -> u32 {
    800_000
}

fn default_generation_timeout() -> u64 {
    300
}

/// Pacing and retry policy, in plain milliseconds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_segments: usize,
    pub chunk_max_chars: usize,
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub inter_chunk_delay_ms: u64,
    pub inter_segment_delay_ms: u64,
    pub inter_episode_delay_ms: u64,
    pub fallback_cooldown_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_segments: 500,
            chunk_max_chars: 4800,
            max_retries: 3,
            initial_retry_delay_ms: 1000,
            inter_chunk_delay_ms: 1000,
            inter_segment_delay_ms: 0,
            inter_episode_delay_ms: 5000,
            fallback_cooldown_ms: 10000,
        }
    }
}

impl PipelineSettings {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            synthesis: SynthesisConfig {
                max_segments: self.max_segments,
                chunk_max_chars: self.chunk_max_chars,
                inter_chunk_delay: Duration::from_millis(self.inter_chunk_delay_ms),
                inter_segment_delay: Duration::from_millis(self.inter_segment_delay_ms),
                retry: RetryPolicy {
                    max_retries: self.max_retries,
                    initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
                },
                ..Default::default()
            },
            inter_episode_delay: Duration::from_millis(self.inter_episode_delay_ms),
            fallback_cooldown: Duration::from_millis(self.fallback_cooldown_ms),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    journey_cast::DEFAULT_CACHE_CAPACITY
}

impl Config {
    /// Load from the file named by `JOURNEY_CONFIG_PATH`, falling back to
    /// `journey_config.toml`. A missing file yields defaults.
    pub fn load() -> eyre::Result<Self> {
        let config_file =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&config_file))
    }

    /// Load from `path` (format chosen by extension) plus the environment
    pub fn load_from(path: &Path) -> eyre::Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found at {}, using defaults", path.display());
        }

        Self::figment(path)
            .extract()
            .wrap_err_with(|| format!("Invalid configuration in {}", path.display()))
    }

    fn figment(path: &Path) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        };

        figment.merge(
            Env::prefixed("JOURNEY_")
                .ignore(&["CONFIG_PATH"])
                .split("__"),
        )
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.to_pipeline_config()
    }
}

/// Resolve `env:VAR_NAME` references; other values are returned trimmed.
pub fn get_env_or_value(value: &str) -> String {
    match value.strip_prefix("env:") {
        Some(env_var) => {
            let result = std::env::var(env_var).unwrap_or_default().trim().to_string();
            if result.is_empty() {
                tracing::warn!("{} resolved to an empty value", env_var);
            } else {
                tracing::debug!("{} = {}", env_var, mask_secret(&result));
            }
            result
        }
        None => value.trim().to_string(),
    }
}

/// Show only the ends of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return format!("*** (len={})", chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{} (len={})", head, tail, chars.len())
}
