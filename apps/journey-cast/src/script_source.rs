//! Script shapes produced by the content generator, and their
//! normalization into the `**Speaker:** text` / `[marker]` grammar the
//! segmenter reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EpisodeError;

/// A script as it arrives from the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptSource {
    /// Already in line grammar
    Text(String),
    /// Ordered turns
    Turns(Vec<ScriptTurn>),
    /// Any other object; coerced best-effort
    Object(Map<String, Value>),
    /// Scalars (numbers, booleans); not coercible
    Other(Value),
}

/// One element of a turn list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptTurn {
    Dialogue(DialogueTurn),
    SoundEffect {
        #[serde(rename = "soundEffect")]
        sound_effect: String,
    },
    Other(Value),
}

/// `{speaker, text}` or `{speaker, line}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

impl DialogueTurn {
    /// First non-empty of `text` and `line`
    pub fn utterance(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.line.as_deref().filter(|l| !l.is_empty()))
    }
}

impl From<&str> for ScriptSource {
    fn from(text: &str) -> Self {
        ScriptSource::Text(text.to_string())
    }
}

impl From<String> for ScriptSource {
    fn from(text: String) -> Self {
        ScriptSource::Text(text)
    }
}

impl ScriptSource {
    /// Produce the canonical line-grammar script.
    ///
    /// Objects never fail: when nothing speaker-like can be extracted the
    /// object is embedded as JSON between a synthetic intro and outro.
    pub fn normalize(&self, episode_title: &str) -> Result<String, EpisodeError> {
        match self {
            ScriptSource::Text(text) => {
                if text.trim().is_empty() {
                    Err(EpisodeError::MissingScript)
                } else {
                    Ok(text.clone())
                }
            }
            ScriptSource::Turns(turns) => {
                let lines: Vec<String> = turns.iter().filter_map(turn_line).collect();
                if lines.is_empty() {
                    return Err(EpisodeError::UnrecognizedScript(format!(
                        "none of {} turns carried dialogue",
                        turns.len()
                    )));
                }
                log::debug!("Joined {} script turns", lines.len());
                Ok(lines.join("\n\n"))
            }
            ScriptSource::Object(map) => Ok(normalize_object(map, episode_title)),
            ScriptSource::Other(value) => Err(EpisodeError::UnrecognizedScript(format!(
                "scalar script: {}",
                value
            ))),
        }
    }
}

fn turn_line(turn: &ScriptTurn) -> Option<String> {
    match turn {
        ScriptTurn::Dialogue(dialogue) => match dialogue.utterance() {
            Some(utterance) => Some(format!("**{}:** {}", dialogue.speaker, utterance)),
            None => {
                log::warn!("Dropping turn by {} with no text", dialogue.speaker);
                None
            }
        },
        ScriptTurn::SoundEffect { sound_effect } => Some(format!("[{}]", sound_effect)),
        ScriptTurn::Other(Value::String(text)) => Some(text.clone()),
        ScriptTurn::Other(Value::Null) => None,
        ScriptTurn::Other(other) => Some(other.to_string()),
    }
}

fn normalize_object(map: &Map<String, Value>, episode_title: &str) -> String {
    let mut lines = Vec::new();

    // Numbered segments: {"0": {speaker, line}, "1": {...}}
    let mut numbered: Vec<(u64, &Value)> = map
        .iter()
        .filter_map(|(k, v)| k.parse::<u64>().ok().map(|n| (n, v)))
        .collect();

    if !numbered.is_empty() {
        log::debug!("Detected numbered dialogue segments");
        numbered.sort_by_key(|(n, _)| *n);
        for (_, segment) in numbered {
            if let Some(speaker) = segment.get("speaker").and_then(Value::as_str) {
                let line = first_str(segment, &["text", "line"]).unwrap_or("");
                lines.push(format!("**{}:** {}", speaker, line));
            }
        }
    } else if let Some(dialogue) = map.get("dialogue").and_then(Value::as_array) {
        for entry in dialogue {
            let speaker = entry.get("speaker").and_then(Value::as_str);
            if let (Some(speaker), Some(line)) = (speaker, first_str(entry, &["text", "line"])) {
                lines.push(format!("**{}:** {}", speaker, line));
            }
        }
    } else {
        for (key, value) in map {
            if let Value::String(text) = value {
                lines.push(format!("**{}:** {}", key, text));
            }
        }
    }

    if !lines.is_empty() {
        log::debug!("Extracted {} dialogue lines from object", lines.len());
        return lines.join("\n\n");
    }

    log::warn!("Could not extract dialogue from script object, embedding it as JSON");
    let body = serde_json::to_string_pretty(map).unwrap_or_else(|_| format!("{:?}", map));
    format!(
        "[Intro Music]\n\n**Host:** Welcome to our podcast about {}.\n\n{}\n\n**Host:** Thanks for listening!",
        episode_title, body
    )
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}
