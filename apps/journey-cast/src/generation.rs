//! Content generation seam: the questionnaire answers, the prompt sent to
//! the language model, and parsing of its reply into episodes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::episode::Episode;
use crate::error::GenerationError;

/// Spoken words per minute used to size scripts
pub const WORDS_PER_MINUTE: u32 = 150;

/// Questionnaire answers driving one journey
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRequest {
    pub topic: String,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub focus: String,
    /// Minutes per episode
    #[serde(default)]
    pub episode_length: u32,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

impl JourneyRequest {
    pub fn target_words(&self) -> u32 {
        self.episode_length * WORDS_PER_MINUTE
    }

    fn tone(&self) -> &str {
        self.tone.as_deref().unwrap_or("friendly and engaging")
    }
}

/// Produces episode scripts for a journey
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate_episodes(&self, request: &JourneyRequest) -> Result<Vec<Episode>, GenerationError>;

    fn generator_name(&self) -> &str;
}

// ============================================================================
// PROMPT
// ============================================================================

fn structure_section(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some("Interviews") => {
            "- Structure as an interview format with the Host asking detailed questions\n\
             - Speaker should provide in-depth answers and real-world examples"
        }
        Some("Storytelling") => {
            "- Include narrative elements and story-driven explanations\n\
             - Use anecdotes and case studies to illustrate points"
        }
        _ => {
            "- Keep it conversational and interactive\n\
             - Balance questions, explanations, and practical insights"
        }
    }
}

fn learning_section(learning_style: Option<&str>) -> &'static str {
    match learning_style {
        Some("Step by step") => {
            "- Present information in clear, sequential steps\n\
             - Build concepts progressively from basic to advanced"
        }
        Some("Big picture first") => {
            "- Start with the overall concept before diving into details\n\
             - Explain the 'why' before the 'how'"
        }
        Some("Through examples") => {
            "- Use plenty of concrete examples and real-world applications\n\
             - Include practical scenarios and case studies"
        }
        Some("By doing") => {
            "- Focus on practical applications and actionable insights\n\
             - Include tips the listener can immediately implement"
        }
        _ => "- Use a balanced mix of explanation methods",
    }
}

/// Render the two-speaker script instructions for `request`
pub fn build_generation_prompt(request: &JourneyRequest) -> String {
    let topic = &request.topic;
    let tone = request.tone();

    format!(
        "Create an engaging podcast series about {topic}.

AUDIENCE & EXPERIENCE:
- The listener is a {level} in this subject
- They want to focus on {focus}
- Their preferred learning style is: {style}

CONTENT PREFERENCES:
- Content type preference: {content_type}
- Tone should be: {tone}
- Each episode should be approximately {words} words ({minutes} minutes)
- Total episodes needed: {count}

CONVERSATION FORMAT REQUIREMENTS:
Create a conversational format with TWO speakers - a Host and a Guest/Expert Speaker:
- Host: Asks questions, guides conversation, provides transitions
- Speaker/Guest: Provides expertise, explanations, and insights
- Make it feel like a natural dialogue, not a monologue

CONTENT STRUCTURE:
{structure}

LEARNING STYLE ADAPTATION:
{learning}

For each episode, provide:
1. A catchy title
2. A brief description (2-3 sentences)
3. Complete script with natural Host-Speaker dialogue

SCRIPT FORMAT:
- Start with \"[Intro Music fades in and out]\"
- Use \"**Host:**\" for all host dialogue
- Use \"**Speaker:**\" for all guest/expert dialogue
- Include natural conversation flow with questions and responses
- End with \"[Outro Music fades in]\"
- Maintain the {tone} tone throughout

Example format:
[Intro Music fades in and out]
**Host:** Welcome to our show! Today we're exploring {topic}. I'm joined by our expert. Can you tell us...?
**Speaker:** Thanks for having me! Absolutely, let me explain...
**Host:** That's fascinating! What about...?
**Speaker:** Great question...
[Outro Music fades in]

Format as JSON array with keys: title, description, and script for each episode.",
        topic = topic,
        level = request.experience_level,
        focus = request.focus,
        style = request.learning_style.as_deref().unwrap_or("varied approaches"),
        content_type = request.content_type.as_deref().unwrap_or("conversational"),
        tone = tone,
        words = request.target_words(),
        minutes = request.episode_length,
        count = request.episode_count,
        structure = structure_section(request.content_type.as_deref()),
        learning = learning_section(request.learning_style.as_deref()),
    )
}

// ============================================================================
// RESPONSE PARSING
// ============================================================================

/// JSON part of a model reply: a ```json fence, else the outermost
/// bracketed span, else the whole text
fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    let open = text.find(['{', '[']);
    let close = text.rfind(['}', ']']);
    match (open, close) {
        (Some(open), Some(close)) if close > open => &text[open..=close],
        _ => text.trim(),
    }
}

/// Parse a model reply into episodes.
///
/// Accepts an array of episodes, an object with an `episodes` array, or a
/// single episode object.
pub fn parse_generated_episodes(text: &str) -> Result<Vec<Episode>, GenerationError> {
    let json = extract_json(text);
    let value: Value = serde_json::from_str(json)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("episodes") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("episodes".to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        other => {
            return Err(GenerationError::MalformedResponse(format!(
                "expected episodes, got {}",
                other
            )))
        }
    };

    let episodes = items
        .into_iter()
        .map(serde_json::from_value::<Episode>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    log::info!("Parsed {} generated episodes", episodes.len());
    Ok(episodes)
}

// ============================================================================
// MOCK GENERATOR
// ============================================================================

/// Offline generator producing short canned two-speaker scripts
#[derive(Debug, Clone, Default)]
pub struct MockScriptGenerator;

#[async_trait]
impl ScriptGenerator for MockScriptGenerator {
    async fn generate_episodes(&self, request: &JourneyRequest) -> Result<Vec<Episode>, GenerationError> {
        let count = request.episode_count.max(1);
        Ok((1..=count)
            .map(|n| {
                let script = format!(
                    "[Intro Music fades in and out]\n\
                     **Host:** Welcome to part {n} of our series on {topic}.\n\
                     **Speaker:** Thanks for having me. Let's focus on {focus}.\n\
                     [Outro Music fades in]",
                    n = n,
                    topic = request.topic,
                    focus = request.focus,
                );
                Episode::new(
                    format!("{} - Part {}", request.topic, n),
                    format!("Episode {} of {} about {}.", n, count, request.topic),
                )
                .with_script(script)
            })
            .collect())
    }

    fn generator_name(&self) -> &str {
        "mock-generator"
    }
}
