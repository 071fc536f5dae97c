use crate::core::catalog::{self, Language};
use crate::core::error::{StudioError, StudioResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_SPEAKERS: usize = 4;
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 60;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Speaker {
    pub name: String,
    pub voice: String,
    pub language: Language,
}

impl Speaker {
    pub fn new(name: impl Into<String>, language: Language) -> Self {
        Self {
            name: name.into(),
            voice: catalog::default_voice(language).to_string(),
            language,
        }
    }
}

/// Ordered, non-empty list of at most [`MAX_SPEAKERS`] speakers whose voices
/// always belong to their language in the catalog.
/// Only built through [`SpeakerRoster::new`] and
/// [`SpeakerRoster::from_speakers`], never deserialized directly.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct SpeakerRoster {
    speakers: Vec<Speaker>,
}

impl SpeakerRoster {
    pub fn new(language: Language) -> Self {
        Self {
            speakers: vec![Speaker::new("Host", language)],
        }
    }

    /// Builds a roster from untrusted input (e.g. a config file), clamping the
    /// size and replacing voices that are not in the speaker's language.
    pub fn from_speakers(mut speakers: Vec<Speaker>, language: Language) -> Self {
        speakers.truncate(MAX_SPEAKERS);
        if speakers.is_empty() {
            return Self::new(language);
        }
        for s in &mut speakers {
            if !catalog::has_voice(s.language, &s.voice) {
                s.voice = catalog::default_voice(s.language).to_string();
            }
        }
        Self { speakers }
    }

    pub fn as_slice(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.speakers.len() >= MAX_SPEAKERS
    }

    /// Appends `Speaker N` with the language's first voice. Returns false
    /// without changing anything when the roster is full.
    pub fn add(&mut self, language: Language) -> bool {
        if self.is_full() {
            return false;
        }
        let name = format!("Speaker {}", self.speakers.len() + 1);
        self.speakers.push(Speaker::new(name, language));
        true
    }

    pub fn remove(&mut self, index: usize) -> StudioResult<Speaker> {
        if self.speakers.len() <= 1 {
            return Err(StudioError::validation("At least one speaker is required."));
        }
        self.check_index(index)?;
        Ok(self.speakers.remove(index))
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> StudioResult<()> {
        self.check_index(index)?;
        self.speakers[index].name = name.into();
        Ok(())
    }

    pub fn set_voice(&mut self, index: usize, voice: &str) -> StudioResult<()> {
        self.check_index(index)?;
        let speaker = &mut self.speakers[index];
        if !catalog::has_voice(speaker.language, voice) {
            return Err(StudioError::validation(format!(
                "Voice '{}' is not available for {}.",
                voice, speaker.language
            )));
        }
        speaker.voice = voice.to_string();
        Ok(())
    }

    /// Moves every speaker to `language` and its default voice.
    pub fn reset_language(&mut self, language: Language) {
        let voice = catalog::default_voice(language);
        for s in &mut self.speakers {
            s.language = language;
            s.voice = voice.to_string();
        }
    }

    fn check_index(&self, index: usize) -> StudioResult<()> {
        if index >= self.speakers.len() {
            return Err(StudioError::validation(format!("No speaker at position {}.", index + 1)));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScriptLine {
    pub speaker: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Config,
    Script,
    Processing,
    Done,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Topic,
    Content,
    Upload,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    #[default]
    Mono,
    Stereo,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishPlatform {
    #[default]
    None,
    Youtube,
    Spotify,
}

/// Episode metadata entered in the publishing panel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishDetails {
    pub title: String,
    pub description: String,
    pub email: String,
}

/// Everything the user has entered or received during one session. Never
/// written to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowState {
    pub step: Step,
    pub input_mode: InputMode,
    pub topic: String,
    pub content: String,
    pub language: Language,
    pub duration_minutes: u32,
    pub channels: Channels,
    pub speakers: SpeakerRoster,
    pub script: Vec<ScriptLine>,
    pub audio_url: Option<String>,
    pub audio_filename: Option<String>,
    pub video_url: Option<String>,
    pub rss_url: Option<String>,
    pub publish_platform: PublishPlatform,
    pub publish: PublishDetails,
    pub is_video_generating: bool,
    pub error: Option<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        let language = Language::default();
        Self {
            step: Step::Config,
            input_mode: InputMode::Topic,
            topic: String::new(),
            content: String::new(),
            language,
            duration_minutes: 2,
            channels: Channels::Mono,
            speakers: SpeakerRoster::new(language),
            script: Vec::new(),
            audio_url: None,
            audio_filename: None,
            video_url: None,
            rss_url: None,
            publish_platform: PublishPlatform::None,
            publish: PublishDetails::default(),
            is_video_generating: false,
            error: None,
        }
    }
}

/// A credential attached to individual requests. It serializes as the bare
/// string but never shows up in debug output.
#[derive(Serialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn is_present(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            f.write_str("ApiKey(***)")
        } else {
            f.write_str("ApiKey(<empty>)")
        }
    }
}

/// LLM and TTS keys for the current session.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub llm: ApiKey,
    pub tts: ApiKey,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self { role: Role::Model, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_speaker_stops_at_four() {
        let mut roster = SpeakerRoster::new(Language::Hindi);
        assert!(roster.add(Language::Hindi));
        assert!(roster.add(Language::Hindi));
        assert!(roster.add(Language::Hindi));
        assert_eq!(roster.len(), 4);
        assert_eq!(roster.as_slice()[3].name, "Speaker 4");

        let before = roster.clone();
        assert!(!roster.add(Language::Hindi));
        assert_eq!(roster, before);
    }

    #[test]
    fn test_last_speaker_cannot_be_removed() {
        let mut roster = SpeakerRoster::new(Language::Tamil);
        let err = roster.remove(0).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(roster.len(), 1);

        roster.add(Language::Tamil);
        let removed = roster.remove(0).unwrap();
        assert_eq!(removed.name, "Host");
        assert_eq!(roster.as_slice()[0].name, "Speaker 2");
    }

    #[test]
    fn test_language_reset_keeps_length_and_fixes_voices() {
        let mut roster = SpeakerRoster::new(Language::Hindi);
        roster.add(Language::Hindi);
        roster.add(Language::Hindi);
        roster.set_voice(1, "Swara").unwrap();

        roster.reset_language(Language::Tamil);

        assert_eq!(roster.len(), 3);
        for s in roster.as_slice() {
            assert_eq!(s.language, Language::Tamil);
            assert!(catalog::has_voice(Language::Tamil, &s.voice));
        }
    }

    #[test]
    fn test_set_voice_rejects_foreign_voice() {
        let mut roster = SpeakerRoster::new(Language::PureEnglish);
        assert!(roster.set_voice(0, "Isai").is_err());
        assert_eq!(roster.as_slice()[0].voice, "Naad");
        roster.set_voice(0, "Dhwani").unwrap();
        assert_eq!(roster.as_slice()[0].voice, "Dhwani");
    }

    #[test]
    fn test_from_speakers_normalises_untrusted_input() {
        let speakers = (0..6)
            .map(|i| Speaker {
                name: format!("S{}", i),
                voice: "NotAVoice".to_string(),
                language: Language::Telugu,
            })
            .collect();
        let roster = SpeakerRoster::from_speakers(speakers, Language::Telugu);
        assert_eq!(roster.len(), MAX_SPEAKERS);
        assert!(roster.as_slice().iter().all(|s| s.voice == "Naadamu"));

        let empty = SpeakerRoster::from_speakers(Vec::new(), Language::Hindi);
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_roster_from_json_goes_through_normalisation() {
        let raw = serde_json::json!([
            {"name": "A", "voice": "Isai", "language": "Hindi"},
            {"name": "B", "voice": "Naad", "language": "Hindi"},
            {"name": "C", "voice": "Naad", "language": "Hindi"},
            {"name": "D", "voice": "Naad", "language": "Hindi"},
            {"name": "E", "voice": "Naad", "language": "Hindi"}
        ]);
        let speakers: Vec<Speaker> = serde_json::from_value(raw).unwrap();
        let roster = SpeakerRoster::from_speakers(speakers, Language::Hindi);

        assert_eq!(roster.len(), MAX_SPEAKERS);
        assert_eq!(roster.as_slice()[0].voice, "Naad");
        let json = serde_json::to_value(&roster).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(MAX_SPEAKERS));
    }

    #[test]
    fn test_api_key_is_redacted_in_debug() {
        let key = ApiKey::new("  sk-secret  ");
        assert_eq!(key.expose(), "sk-secret");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"sk-secret\"");
        assert!(!ApiKey::new("   ").is_present());
    }

    #[test]
    fn test_speaker_serializes_with_backend_field_names() {
        let json = serde_json::to_value(Speaker::new("Host", Language::Hindi)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Host", "voice": "Naad", "language": "Hindi"})
        );
    }
}
