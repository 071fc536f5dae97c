use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::catalog::Language;
use crate::core::state::{
    Channels, InputMode, Speaker, SpeakerRoster, WorkflowState, MAX_DURATION_MINUTES,
    MIN_DURATION_MINUTES,
};

pub const DEFAULT_CONFIG_PATH: &str = "studio.yml";
pub const CONFIG_PATH_ENV: &str = "PODCAST_STUDIO_CONFIG";

/// Backend origin for local development builds.
pub const LOCAL_BACKEND_URL: &str = "http://localhost:8000";

/// Backend origin baked in at build time. Debug builds always talk to the
/// local server; release builds use `PODCAST_STUDIO_REMOTE_URL` if it was
/// set when compiling.
pub fn backend_base_url() -> &'static str {
    if cfg!(debug_assertions) {
        return LOCAL_BACKEND_URL;
    }
    option_env!("PODCAST_STUDIO_REMOTE_URL").unwrap_or(LOCAL_BACKEND_URL)
}

/// Session defaults. API keys are deliberately not part of this type.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub language: Language,

    #[serde(default = "default_duration")]
    pub duration_minutes: u32,

    #[serde(default)]
    pub channels: Channels,

    #[serde(default)]
    pub input_mode: InputMode,

    #[serde(default)]
    pub speakers: Vec<Speaker>,
}

fn default_duration() -> u32 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            duration_minutes: default_duration(),
            channels: Channels::default(),
            input_mode: InputMode::default(),
            speakers: Vec::new(),
        }
    }
}

impl Config {
    /// Resolves the config path from the environment, falling back to
    /// `studio.yml` in the working directory.
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Initial workflow state for a new session.
    pub fn initial_state(&self) -> WorkflowState {
        let duration = self
            .duration_minutes
            .clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
        if duration != self.duration_minutes {
            warn!(
                "duration_minutes {} out of range, using {}",
                self.duration_minutes, duration
            );
        }

        WorkflowState {
            input_mode: self.input_mode,
            language: self.language,
            duration_minutes: duration,
            channels: self.channels,
            speakers: SpeakerRoster::from_speakers(self.speakers.clone(), self.language),
            ..WorkflowState::default()
        }
    }

    /// Copies the user-editable defaults out of a session so they can be saved.
    pub fn remember(&mut self, state: &WorkflowState) {
        self.language = state.language;
        self.duration_minutes = state.duration_minutes;
        self.channels = state.channels;
        self.input_mode = state.input_mode;
        self.speakers = state.speakers.as_slice().to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Step;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load(dir.path().join("nope.yml"))?;
        let state = config.initial_state();
        assert_eq!(state.step, Step::Config);
        assert_eq!(state.language, Language::Hindi);
        assert_eq!(state.duration_minutes, 2);
        assert_eq!(state.speakers.len(), 1);
        assert_eq!(state.speakers.as_slice()[0].name, "Host");
        Ok(())
    }

    #[test]
    fn test_partial_yaml_is_defaulted_and_normalised() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("studio.yml");
        fs::write(
            &path,
            "language: Tamil\nduration_minutes: 500\nspeakers:\n  - name: Anu\n    voice: Naad\n    language: Tamil\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.channels, Channels::Mono);

        let state = config.initial_state();
        assert_eq!(state.language, Language::Tamil);
        assert_eq!(state.duration_minutes, MAX_DURATION_MINUTES);
        assert_eq!(state.speakers.as_slice()[0].name, "Anu");
        assert_eq!(state.speakers.as_slice()[0].voice, "Vaani");
        Ok(())
    }

    #[test]
    fn test_save_then_load_keeps_session_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("studio.yml");

        let mut state = Config::default().initial_state();
        state.channels = Channels::Stereo;
        state.speakers.add(state.language);

        let mut config = Config::default();
        config.remember(&state);
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded.channels, Channels::Stereo);
        assert_eq!(loaded.speakers.len(), 2);
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.yml");
        fs::write(&path, "language: [not, a, language]").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }
}
