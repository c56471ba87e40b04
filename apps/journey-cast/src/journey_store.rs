//! Journey persistence
//!
//! Journeys are kept in one JSON file. Audio payloads are never written:
//! every episode loses its `audio_url` on the way to disk and keeps a
//! sticky `had_audio` flag instead, so reloaded episodes can be
//! regenerated on demand.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::episode::Episode;
use crate::error::StoreError;
use crate::generation::JourneyRequest;

/// Serialized size that triggers eviction of old journeys
pub const DEFAULT_MAX_STORE_BYTES: usize = 4_000_000;
/// Eviction stops once the store fits under this size
pub const DEFAULT_TRIM_TO_BYTES: usize = 3_000_000;

/// One questionnaire run and its episodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub request: JourneyRequest,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    pub created_at: DateTime<Utc>,
}

impl Journey {
    pub fn new(request: JourneyRequest, episodes: Vec<Episode>) -> Self {
        Self {
            id: String::new(),
            request,
            episodes,
            created_at: Utc::now(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.request.topic
    }

    /// Indices of episodes whose audio should be synthesized again
    pub fn episodes_needing_regeneration(&self) -> Vec<usize> {
        self.episodes
            .iter()
            .enumerate()
            .filter(|(_, e)| e.needs_regeneration())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Drop audio payloads, remembering which episodes had one
pub fn strip_audio(journey: &mut Journey) {
    for episode in &mut journey.episodes {
        episode.had_audio = episode.had_audio || episode.audio_url.is_some();
        episode.audio_url = None;
    }
}

/// Key-value store of journeys
pub trait JourneyStore {
    /// Store a new journey under a fresh id, returning the id
    fn save(&self, journey: Journey) -> Result<String, StoreError>;

    /// Replace the journey with the same id; `false` if there is none
    fn update(&self, journey: &Journey) -> Result<bool, StoreError>;

    /// All journeys, oldest first; unreadable storage reads as empty
    fn get_all(&self) -> Vec<Journey>;

    fn get_by_id(&self, id: &str) -> Option<Journey> {
        self.get_all().into_iter().find(|j| j.id == id)
    }
}

/// JSON-file backed store
#[derive(Debug, Clone)]
pub struct FileJourneyStore {
    path: PathBuf,
    max_bytes: usize,
    trim_to_bytes: usize,
}

impl FileJourneyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_STORE_BYTES,
            trim_to_bytes: DEFAULT_TRIM_TO_BYTES,
        }
    }

    /// Store under the user config directory
    pub fn default_location() -> Result<Self, StoreError> {
        let mut path = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        path.push("journey-cast");
        path.push("journeys.json");
        Ok(Self::new(path))
    }

    pub fn with_limits(mut self, max_bytes: usize, trim_to_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self.trim_to_bytes = trim_to_bytes.min(max_bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, journeys: &[Journey]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(journeys)?;
        fs::write(&self.path, json)?;
        ::log::debug!("Saved {} journeys to {}", journeys.len(), self.path.display());
        Ok(())
    }

    /// Evict the oldest journeys when the store grew past `max_bytes`
    fn enforce_size_limit(&self, journeys: &mut Vec<Journey>) -> Result<(), StoreError> {
        let mut size = serde_json::to_string(journeys)?.len();
        ::log::debug!("Journey storage size: approximately {} KB", size / 1024);

        if size <= self.max_bytes {
            return Ok(());
        }

        ::log::warn!("Journey storage is {} bytes, removing oldest journeys", size);
        while journeys.len() > 1 && size > self.trim_to_bytes {
            let evicted = journeys.remove(0);
            ::log::info!("Evicted journey {} ({})", evicted.id, evicted.topic());
            size = serde_json::to_string(journeys)?.len();
        }
        Ok(())
    }
}

impl JourneyStore for FileJourneyStore {
    fn save(&self, mut journey: Journey) -> Result<String, StoreError> {
        journey.id = uuid::Uuid::new_v4().simple().to_string();
        journey.created_at = Utc::now();
        strip_audio(&mut journey);

        let id = journey.id.clone();
        let mut journeys = self.get_all();
        journeys.push(journey);
        self.enforce_size_limit(&mut journeys)?;
        self.write_all(&journeys)?;

        ::log::info!("Journey {} saved (without audio data)", id);
        Ok(id)
    }

    fn update(&self, journey: &Journey) -> Result<bool, StoreError> {
        let mut journeys = self.get_all();
        let Some(slot) = journeys.iter_mut().find(|j| j.id == journey.id) else {
            ::log::warn!("Journey {} not found for update", journey.id);
            return Ok(false);
        };

        let mut stored = journey.clone();
        strip_audio(&mut stored);
        *slot = stored;
        self.write_all(&journeys)?;

        ::log::info!("Journey {} updated (without audio data)", journey.id);
        Ok(true)
    }

    fn get_all(&self) -> Vec<Journey> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Vec<Journey>>(&content) {
                Ok(journeys) => journeys,
                Err(e) => {
                    ::log::warn!("Failed to parse journeys: {}, starting fresh", e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                ::log::warn!("Failed to read journeys: {}, starting fresh", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::EpisodeStatus;

    fn request(topic: &str) -> JourneyRequest {
        JourneyRequest {
            topic: topic.to_string(),
            experience_level: "Beginner".to_string(),
            focus: "Fundamentals".to_string(),
            episode_length: 3,
            episode_count: 2,
            ..Default::default()
        }
    }

    fn voiced_episode(title: &str) -> Episode {
        let mut episode = Episode::new(title, "").with_script("**Host:** Hi.");
        episode.mark_ready("data:audio/mp3;base64,QUJD".to_string(), false);
        episode
    }

    fn store() -> (tempfile::TempDir, FileJourneyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJourneyStore::new(dir.path().join("nested").join("journeys.json"));
        (dir, store)
    }

    #[test]
    fn test_save_strips_audio_and_keeps_had_audio() {
        let (_dir, store) = store();
        let journey = Journey::new(
            request("Rust"),
            vec![voiced_episode("One"), Episode::new("Two", "").with_script("**Host:** Later.")],
        );

        let id = store.save(journey).unwrap();
        let loaded = store.get_by_id(&id).unwrap();

        assert_eq!(loaded.topic(), "Rust");
        assert!(loaded.episodes[0].audio_url.is_none());
        assert!(loaded.episodes[0].had_audio);
        assert_eq!(loaded.episodes[0].status, EpisodeStatus::Ready);
        assert!(!loaded.episodes[1].had_audio);
        assert_eq!(loaded.episodes_needing_regeneration(), vec![0]);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("audioUrl"));
        assert!(raw.contains("\"experienceLevel\":\"Beginner\""));
    }

    #[test]
    fn test_update_does_not_clear_had_audio() {
        let (_dir, store) = store();
        let id = store
            .save(Journey::new(request("Go"), vec![voiced_episode("One")]))
            .unwrap();

        // Reloaded copy has no URL; saving it again must keep the flag
        let mut loaded = store.get_by_id(&id).unwrap();
        loaded.episodes[0].description = "edited".to_string();
        assert!(store.update(&loaded).unwrap());

        let reloaded = store.get_by_id(&id).unwrap();
        assert!(reloaded.episodes[0].had_audio);
        assert_eq!(reloaded.episodes[0].description, "edited");
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, store) = store();
        let mut journey = Journey::new(request("Zig"), Vec::new());
        journey.id = "missing".to_string();

        assert!(!store.update(&journey).unwrap());
    }

    #[test]
    fn test_save_assigns_distinct_ids() {
        let (_dir, store) = store();
        let a = store.save(Journey::new(request("A"), Vec::new())).unwrap();
        let b = store.save(Journey::new(request("B"), Vec::new())).unwrap();

        assert_ne!(a, b);
        let topics: Vec<String> = store.get_all().iter().map(|j| j.topic().to_string()).collect();
        assert_eq!(topics, vec!["A", "B"]);
    }

    #[test]
    fn test_oldest_journeys_are_evicted() {
        let (_dir, store) = store();
        let store = store.with_limits(2_000, 1_000);
        let padding = "x".repeat(600);

        for topic in ["first", "second", "third"] {
            let mut episode = Episode::new(topic, padding.clone());
            episode.status = EpisodeStatus::Pending;
            store
                .save(Journey::new(request(topic), vec![episode]))
                .unwrap();
        }

        let remaining = store.get_all();
        assert!(!remaining.is_empty());
        assert_eq!(remaining.last().unwrap().topic(), "third");
        assert!(remaining.iter().all(|j| j.topic() != "first"));
    }

    #[test]
    fn test_last_journey_is_never_evicted() {
        let (_dir, store) = store();
        let store = store.with_limits(100, 50);

        let id = store
            .save(Journey::new(request("huge"), vec![Episode::new("E", "y".repeat(500))]))
            .unwrap();

        assert_eq!(store.get_all().len(), 1);
        assert!(store.get_by_id(&id).is_some());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let (dir, _) = store();
        let path = dir.path().join("journeys.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileJourneyStore::new(path);
        assert!(store.get_all().is_empty());
        assert!(store.get_by_id("anything").is_none());
    }
}
