//! Journey TTS Client - command-line driver for the episode audio pipeline
//!
//! Subcommands:
//! - `generate`: questionnaire answers → generated scripts → audio → saved journey
//! - `synthesize`: episode JSON file → audio
//! - `list` / `show`: inspect saved journeys
//! - `regenerate`: re-synthesize episodes whose audio was dropped by the store

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

use journey_cast::{
    episode_key, parse_generated_episodes, progress_callback, regenerate_episode, strip_audio,
    CachingSynthesizer, Episode, EpisodePipeline, EpisodeStatus, FileJourneyStore, Journey,
    JourneyRequest, JourneyStore, MockScriptGenerator, MockSpeechSynthesizer, PipelineProgress,
    RegenerateOutcome, RegenerationGuard, ScriptGenerator, SpeechSynthesizer,
};
use journey_tts_client::{export_episode_audio, Config, GeminiScriptClient, GoogleTtsClient};

type Engine = CachingSynthesizer<Arc<dyn SpeechSynthesizer>>;

#[derive(Parser)]
#[command(
    name = "journey-tts-client",
    about = "Generate multi-speaker podcast journeys and synthesize their audio",
    version
)]
struct Cli {
    /// Config file (overrides JOURNEY_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use offline mock engines instead of the HTTP endpoints
    #[arg(long, global = true, default_value_t = false)]
    mock: bool,

    /// Directory for exported audio (overrides output_dir)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate scripts for a topic, synthesize them and save the journey
    Generate(GenerateArgs),
    /// Synthesize episodes read from a JSON file
    Synthesize {
        /// JSON array of {title, description, script}
        input: PathBuf,
    },
    /// List saved journeys
    List,
    /// Print one saved journey as JSON
    Show { id: String },
    /// Re-synthesize episodes of a saved journey that lost their audio
    Regenerate { id: String },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    topic: String,
    #[arg(long, default_value = "Beginner")]
    experience_level: String,
    #[arg(long, default_value = "Fundamentals")]
    focus: String,
    /// Minutes per episode
    #[arg(long, default_value_t = 3)]
    episode_length: u32,
    #[arg(long, default_value_t = 1)]
    episode_count: u32,
    #[arg(long)]
    content_type: Option<String>,
    #[arg(long)]
    learning_style: Option<String>,
    #[arg(long)]
    tone: Option<String>,
    /// Do not persist the journey
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

impl GenerateArgs {
    fn to_request(&self) -> JourneyRequest {
        JourneyRequest {
            topic: self.topic.clone(),
            experience_level: self.experience_level.clone(),
            focus: self.focus.clone(),
            episode_length: self.episode_length,
            episode_count: self.episode_count,
            content_type: self.content_type.clone(),
            learning_style: self.learning_style.clone(),
            tone: self.tone.clone(),
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_pipeline(config: &Config, mock: bool) -> Result<EpisodePipeline<Engine>> {
    let engine: Arc<dyn SpeechSynthesizer> = if mock {
        Arc::new(MockSpeechSynthesizer)
    } else {
        Arc::new(GoogleTtsClient::new(&config.tts)?)
    };
    tracing::info!("Using TTS engine: {}", engine.engine_name());

    let engine = CachingSynthesizer::new(engine, config.cache.capacity);
    let pipeline = EpisodePipeline::new(engine, config.pipeline_config())?
        .with_progress(progress_callback(|p: PipelineProgress| {
            tracing::info!(
                "[{}/{}] \"{}\" is {} ({:.0}%)",
                p.completed,
                p.total,
                p.title,
                p.status,
                p.percentage
            );
        }));

    let token = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current episode");
            token.cancel();
        }
    });

    Ok(pipeline)
}

fn build_generator(config: &Config, mock: bool) -> Result<Box<dyn ScriptGenerator>> {
    if mock {
        Ok(Box::new(MockScriptGenerator))
    } else {
        Ok(Box::new(GeminiScriptClient::new(&config.generation)?))
    }
}

fn open_store(config: &Config) -> Result<FileJourneyStore> {
    match &config.store_path {
        Some(path) => Ok(FileJourneyStore::new(path)),
        None => FileJourneyStore::default_location().wrap_err("Cannot locate journey store"),
    }
}

fn summarize(episodes: &[Episode]) {
    for (i, episode) in episodes.iter().enumerate() {
        let note = match (&episode.status, episode.is_fallback_audio, &episode.error) {
            (EpisodeStatus::Ready, true, _) => " (placeholder audio)".to_string(),
            (EpisodeStatus::Failed, _, Some(error)) => format!(": {}", error),
            _ => String::new(),
        };
        println!("{:>3}. {} [{}]{}", i + 1, episode.title, episode.status, note);
    }
}

fn export(config: &Config, episodes: &[Episode]) -> Result<()> {
    let written = export_episode_audio(&config.output_dir, episodes)?;
    if !written.is_empty() {
        println!("Wrote {} audio file(s) to {}", written.len(), config.output_dir.display());
    }
    Ok(())
}

async fn run_generate(config: &Config, mock: bool, args: &GenerateArgs) -> Result<()> {
    let request = args.to_request();
    let generator = build_generator(config, mock)?;
    let pipeline = build_pipeline(config, mock)?;

    let episodes = generator
        .generate_episodes(&request)
        .await
        .wrap_err("Script generation failed")?;
    tracing::info!("{} generated {} episodes", generator.generator_name(), episodes.len());

    let episodes = pipeline.generate_audio_for_episodes(episodes).await;
    summarize(&episodes);
    export(config, &episodes)?;

    if !args.no_save {
        let id = open_store(config)?.save(Journey::new(request, episodes))?;
        println!("Saved journey {}", id);
    }
    Ok(())
}

async fn run_synthesize(config: &Config, mock: bool, input: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .wrap_err_with(|| format!("Failed to read {}", input.display()))?;
    let episodes = parse_generated_episodes(&text)?;

    let pipeline = build_pipeline(config, mock)?;
    let episodes = pipeline.generate_audio_for_episodes(episodes).await;
    export(config, &episodes)?;

    let mut printable = Journey::new(JourneyRequest::default(), episodes);
    strip_audio(&mut printable);
    println!("{}", serde_json::to_string_pretty(&printable.episodes)?);
    Ok(())
}

fn run_list(config: &Config) -> Result<()> {
    let journeys = open_store(config)?.get_all();
    if journeys.is_empty() {
        println!("No saved journeys");
        return Ok(());
    }

    for journey in journeys {
        let ready = journey
            .episodes
            .iter()
            .filter(|e| e.status == EpisodeStatus::Ready)
            .count();
        println!(
            "{}  {}  {}  ({}/{} ready)",
            journey.id,
            journey.created_at.format("%Y-%m-%d %H:%M"),
            journey.topic(),
            ready,
            journey.episodes.len()
        );
    }
    Ok(())
}

fn run_show(config: &Config, id: &str) -> Result<()> {
    let journey = open_store(config)?
        .get_by_id(id)
        .ok_or_else(|| eyre::eyre!("Journey not found: {}", id))?;
    println!("{}", serde_json::to_string_pretty(&journey)?);
    Ok(())
}

async fn run_regenerate(config: &Config, mock: bool, id: &str) -> Result<()> {
    let store = open_store(config)?;
    let mut journey = store
        .get_by_id(id)
        .ok_or_else(|| eyre::eyre!("Journey not found: {}", id))?;

    let indices = journey.episodes_needing_regeneration();
    if indices.is_empty() {
        println!("No episodes need regeneration");
        return Ok(());
    }

    let pipeline = build_pipeline(config, mock)?;
    let guard = RegenerationGuard::new();

    for index in indices {
        let key = episode_key(&journey.id, index);
        let episode = journey.episodes[index].clone();
        match regenerate_episode(&pipeline, &guard, &key, episode).await {
            RegenerateOutcome::Finished(episode) => journey.episodes[index] = episode,
            outcome => tracing::info!("Skipped {}: {:?}", key, outcome),
        }
    }

    summarize(&journey.episodes);
    export(config, &journey.episodes)?;
    store.update(&journey)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }

    init_tracing(&config.log_level);

    match &cli.command {
        Command::Generate(args) => run_generate(&config, cli.mock, args).await,
        Command::Synthesize { input } => run_synthesize(&config, cli.mock, input).await,
        Command::List => run_list(&config),
        Command::Show { id } => run_show(&config, id),
        Command::Regenerate { id } => run_regenerate(&config, cli.mock, id).await,
    }
}
