//! Voice and audio settings sent with every TTS request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SsmlGender {
    Male,
    Female,
    Neutral,
}

/// Voice selection, serialized as the endpoint's `voice` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub language_code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_gender: Option<SsmlGender>,
}

impl VoiceProfile {
    pub fn new(language_code: &str, name: &str, ssml_gender: Option<SsmlGender>) -> Self {
        Self {
            language_code: language_code.to_string(),
            name: name.to_string(),
            ssml_gender,
        }
    }

    /// Voice used for the "available shortly" placeholder narration
    pub fn announcer() -> Self {
        Self::new("en-US", "en-US-Neural2-D", Some(SsmlGender::Male))
    }
}

/// Encoding settings, serialized as the endpoint's `audioConfig` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub audio_encoding: String,
    pub speaking_rate: f32,
    pub pitch: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            audio_encoding: "MP3".to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
        }
    }
}

/// Fixed speaker-role to voice mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTable {
    pub host: VoiceProfile,
    pub speaker: VoiceProfile,
    pub guest: VoiceProfile,
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self {
            host: VoiceProfile::new("en-US", "en-US-Chirp3-HD-Achird", None),
            speaker: VoiceProfile::new("en-US", "en-US-Chirp3-HD-Kore", None),
            guest: VoiceProfile::new("en-US", "en-US-Neural2-C", Some(SsmlGender::Female)),
        }
    }
}

impl VoiceTable {
    /// Resolve a speaker label; unknown and empty labels get the host voice
    pub fn resolve(&self, speaker: &str) -> &VoiceProfile {
        match speaker {
            "Host" => &self.host,
            "Speaker" => &self.speaker,
            "Guest" => &self.guest,
            _ => &self.host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_to_host() {
        let table = VoiceTable::default();

        assert_eq!(table.resolve("Speaker").name, "en-US-Chirp3-HD-Kore");
        assert_eq!(table.resolve("Guest").ssml_gender, Some(SsmlGender::Female));
        assert_eq!(table.resolve("Narrator"), &table.host);
        assert_eq!(table.resolve(""), &table.host);
    }

    #[test]
    fn test_wire_shape() {
        let voice = serde_json::to_value(VoiceProfile::announcer()).unwrap();
        assert_eq!(
            voice,
            serde_json::json!({
                "languageCode": "en-US",
                "name": "en-US-Neural2-D",
                "ssmlGender": "MALE"
            })
        );

        let host = serde_json::to_value(&VoiceTable::default().host).unwrap();
        assert!(host.get("ssmlGender").is_none());

        let audio = serde_json::to_value(AudioConfig::default()).unwrap();
        assert_eq!(audio["audioEncoding"], "MP3");
        assert_eq!(audio["speakingRate"], 1.0);
    }
}
