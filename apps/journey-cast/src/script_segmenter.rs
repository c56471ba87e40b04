//! Script Segmenter - Split a multi-speaker podcast script into ordered segments
//!
//! Recognized line grammar:
//! ```text
//! [Intro Music fades in and out]
//! **Host:** Welcome to the show.
//! **Speaker:** Thanks for having me,
//! and this line continues the same turn.
//! ```
//!
//! Sound markers stay in the segment stream so clients can hook sound cues
//! on them, but they are never sent to TTS.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TtsError;

// ============================================================================
// DATA MODELS
// ============================================================================

/// One ordered piece of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    /// Dialogue attributed to a speaker (empty label before the first turn)
    Speech { speaker: String, text: String },
    /// A bracketed sound-effect marker, kept verbatim
    Sound { text: String },
}

impl Segment {
    pub fn speech(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Segment::Speech {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    pub fn sound(text: impl Into<String>) -> Self {
        Segment::Sound { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Segment::Speech { text, .. } | Segment::Sound { text } => text,
        }
    }

    pub fn speaker(&self) -> Option<&str> {
        match self {
            Segment::Speech { speaker, .. } => Some(speaker),
            Segment::Sound { .. } => None,
        }
    }

    pub fn is_sound(&self) -> bool {
        matches!(self, Segment::Sound { .. })
    }
}

// ============================================================================
// SEGMENTER
// ============================================================================

/// Script segmenter - splits a raw script into speech and sound segments
pub struct ScriptSegmenter {
    /// Whole-line `[...]` marker, trailing whitespace allowed
    sound_regex: Regex,
    /// `**Name:**` at the start of a line, plus the whitespace after it
    speaker_regex: Regex,
}

impl ScriptSegmenter {
    pub fn new() -> Result<Self, TtsError> {
        let sound_regex = Regex::new(r"^\[.*\]\s*$")
            .map_err(|e| TtsError::Setup(format!("Failed to create sound regex: {}", e)))?;
        let speaker_regex = Regex::new(r"^\*\*(.*?):\*\*\s*")
            .map_err(|e| TtsError::Setup(format!("Failed to create speaker regex: {}", e)))?;

        Ok(Self {
            sound_regex,
            speaker_regex,
        })
    }

    /// Parse a script into segments, in source order.
    ///
    /// Lines that are neither a marker nor a speaker turn are appended to the
    /// active turn. Text before the first turn is attributed to `""`.
    pub fn segment(&self, script: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current_speaker = String::new();
        let mut current_text = String::new();

        for line in script.lines() {
            if self.sound_regex.is_match(line) {
                Self::flush(&mut segments, &current_speaker, &mut current_text);
                segments.push(Segment::sound(line.trim_end()));
                continue;
            }

            if let Some(caps) = self.speaker_regex.captures(line) {
                Self::flush(&mut segments, &current_speaker, &mut current_text);

                current_speaker = caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let marker_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
                current_text = line[marker_end..].to_string();
            } else {
                current_text.push(' ');
                current_text.push_str(line);
            }
        }

        Self::flush(&mut segments, &current_speaker, &mut current_text);

        log::debug!("Segmented script into {} segments", segments.len());
        segments
    }

    /// Segment a loosely typed value. Anything but a JSON string yields no
    /// segments; callers are expected to normalize scripts beforehand.
    pub fn segment_value(&self, script: &serde_json::Value) -> Vec<Segment> {
        match script.as_str() {
            Some(text) => self.segment(text),
            None => {
                log::error!(
                    "Invalid script format. Expected string but got: {}",
                    json_kind(script)
                );
                Vec::new()
            }
        }
    }

    fn flush(segments: &mut Vec<Segment>, speaker: &str, text: &mut String) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            segments.push(Segment::speech(speaker, trimmed));
        }
        text.clear();
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> ScriptSegmenter {
        ScriptSegmenter::new().unwrap()
    }

    #[test]
    fn test_intro_host_speaker() {
        let script = "[Intro Music]\n**Host:** Welcome to the show.\n**Speaker:** Thanks for having me.";
        let segments = segmenter().segment(script);

        assert_eq!(
            segments,
            vec![
                Segment::sound("[Intro Music]"),
                Segment::speech("Host", "Welcome to the show."),
                Segment::speech("Speaker", "Thanks for having me."),
            ]
        );
    }

    #[test]
    fn test_multiline_turn_is_space_joined() {
        let script = "**Host:** First line\nsecond line\n\nthird line\n**Guest:** Reply.";
        let segments = segmenter().segment(script);

        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0],
            Segment::speech("Host", "First line second line  third line")
        );
        assert_eq!(segments[1], Segment::speech("Guest", "Reply."));
    }

    #[test]
    fn test_sound_marker_flushes_and_speaker_persists() {
        let script = "**Host:** Before the jingle.\n[Jingle]  \nAfter the jingle.";
        let segments = segmenter().segment(script);

        assert_eq!(
            segments,
            vec![
                Segment::speech("Host", "Before the jingle."),
                Segment::sound("[Jingle]"),
                Segment::speech("Host", "After the jingle."),
            ]
        );
    }

    #[test]
    fn test_leading_text_has_empty_speaker() {
        let segments = segmenter().segment("Cold open narration.\n**Host:** Hi.");

        assert_eq!(segments[0].speaker(), Some(""));
        assert_eq!(segments[0].text(), "Cold open narration.");
        assert_eq!(segments[1].speaker(), Some("Host"));
    }

    #[test]
    fn test_empty_turns_are_dropped() {
        let segments = segmenter().segment("**Host:**\n**Speaker:**   \n[Outro]");

        assert_eq!(segments, vec![Segment::sound("[Outro]")]);
    }

    #[test]
    fn test_bracket_inside_line_is_not_a_marker() {
        let segments = segmenter().segment("**Host:** Cue [laughs] here.");

        assert_eq!(segments, vec![Segment::speech("Host", "Cue [laughs] here.")]);
    }

    #[test]
    fn test_non_string_value_yields_no_segments() {
        let s = segmenter();

        assert!(s.segment_value(&serde_json::json!({"Host": "hi"})).is_empty());
        assert!(s.segment_value(&serde_json::json!(42)).is_empty());
        assert_eq!(s.segment_value(&serde_json::json!("**Host:** hi")).len(), 1);
    }

    #[test]
    fn test_speech_reconstructs_source_text() {
        let turns = [
            ("Host", "Welcome back everyone."),
            ("Speaker", "Glad to be here. Let's dig in!"),
            ("Host", "What is a closure?"),
        ];
        let mut script = String::from("[Intro Music fades in and out]\n");
        for (speaker, line) in &turns {
            script.push_str(&format!("**{}:** {}\n", speaker, line));
        }
        script.push_str("[Outro Music fades in]");

        let segments = segmenter().segment(&script);
        let speech: Vec<(&str, &str)> = segments
            .iter()
            .filter_map(|s| s.speaker().map(|sp| (sp, s.text())))
            .collect();

        assert_eq!(speech, turns.to_vec());
        assert!(segments.first().unwrap().is_sound());
        assert!(segments.last().unwrap().is_sound());
    }
}
