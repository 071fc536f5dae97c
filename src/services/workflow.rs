use crate::core::catalog::Language;
use crate::core::error::{StudioError, StudioResult};
use crate::core::state::{
    ApiKey, Channels, Credentials, InputMode, PublishDetails, PublishPlatform, ScriptLine, Step,
    WorkflowState, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
use crate::services::gateway::{
    AudioArtifact, AudioRequest, Backend, DocumentKind, DocumentUpload, RegenerateRequest,
    RssRequest, ScriptRequest, VideoRequest,
};
use crate::services::pricing::ScriptEstimate;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

pub const MISSING_SCRIPT_INPUT: &str = "Please provide topic/content and Gemini API Key.";
pub const MISSING_LLM_KEY: &str = "Please provide Gemini API Key.";
pub const MISSING_TTS_KEY: &str = "Please provide Fonada API Key.";
pub const INVALID_EMAIL: &str = "Please provide a valid email to generate your RSS feed.";
pub const NOT_PUBLISHABLE: &str = "Generate audio before publishing.";
pub const DEFAULT_TITLE: &str = "AI Podcast";

/// An in-flight line regeneration. Only the most recently issued ticket for
/// an index may write its result back.
#[derive(Debug, Clone)]
pub struct RegenerationTicket {
    pub index: usize,
    seq: u64,
    pub request: RegenerateRequest,
}

/// An in-flight video render, bound to the audio it was requested for.
#[derive(Debug, Clone)]
pub struct VideoTicket {
    audio_filename: String,
    pub request: VideoRequest,
}

/// Owns the session state and drives it through
/// `config -> script -> processing -> done`.
///
/// Every backend operation comes as a `prepare_*` / `complete_*` pair of
/// synchronous state transitions, plus an async method that runs the request
/// in between. Callers that need several requests in flight at once (line
/// regeneration, video rendering) use the pair directly.
pub struct WorkflowController {
    state: WorkflowState,
    credentials: Credentials,
    backend: Arc<dyn Backend>,
    next_seq: u64,
    pending_regenerations: HashMap<usize, u64>,
}

impl WorkflowController {
    pub fn new(state: WorkflowState, backend: Arc<dyn Backend>) -> Self {
        Self {
            state,
            credentials: Credentials::default(),
            backend,
            next_seq: 0,
            pending_regenerations: HashMap::new(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn estimate(&self) -> ScriptEstimate {
        ScriptEstimate::for_script(&self.state.script)
    }

    fn record<T>(&mut self, result: StudioResult<T>) -> StudioResult<T> {
        if let Err(e) = &result {
            warn!("Action failed: {}", e);
            self.state.error = Some(e.to_string());
        }
        result
    }

    fn require_step(&self, step: Step, msg: &str) -> StudioResult<()> {
        if self.state.step != step {
            return Err(StudioError::validation(msg));
        }
        Ok(())
    }

    // --- Inputs ---

    pub fn set_credentials(&mut self, llm: ApiKey, tts: ApiKey) {
        self.credentials = Credentials { llm, tts };
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.state.input_mode = mode;
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.state.topic = topic.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.state.content = content.into();
    }

    pub fn set_duration(&mut self, minutes: u32) {
        self.state.duration_minutes = minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
    }

    pub fn set_channels(&mut self, channels: Channels) {
        self.state.channels = channels;
    }

    /// Changing the language recreates every speaker's language and voice.
    pub fn set_language(&mut self, language: Language) {
        self.state.language = language;
        self.state.speakers.reset_language(language);
    }

    pub fn add_speaker(&mut self) -> bool {
        let language = self.state.language;
        self.state.speakers.add(language)
    }

    pub fn remove_speaker(&mut self, index: usize) -> StudioResult<()> {
        let result = self.state.speakers.remove(index).map(|_| ());
        self.record(result)
    }

    pub fn rename_speaker(&mut self, index: usize, name: impl Into<String>) -> StudioResult<()> {
        let result = self.state.speakers.rename(index, name);
        self.record(result)
    }

    pub fn set_speaker_voice(&mut self, index: usize, voice: &str) -> StudioResult<()> {
        let result = self.state.speakers.set_voice(index, voice);
        self.record(result)
    }

    pub fn edit_line(&mut self, index: usize, text: impl Into<String>) -> StudioResult<()> {
        let result = self.check_line(index);
        self.record(result)?;
        self.state.script[index].text = text.into();
        Ok(())
    }

    fn check_line(&self, index: usize) -> StudioResult<()> {
        self.require_step(Step::Script, "The script can only be edited before audio generation.")?;
        if index >= self.state.script.len() {
            return Err(StudioError::validation(format!("No script line at position {}.", index + 1)));
        }
        Ok(())
    }

    // --- Script generation ---

    pub fn prepare_script(&mut self) -> StudioResult<ScriptRequest> {
        self.state.error = None;
        let result = self.build_script_request();
        self.record(result)
    }

    fn build_script_request(&self) -> StudioResult<ScriptRequest> {
        self.require_step(Step::Config, "A script has already been generated.")?;

        let s = &self.state;
        let has_input = match s.input_mode {
            InputMode::Topic => !s.topic.trim().is_empty(),
            InputMode::Content | InputMode::Upload => !s.content.trim().is_empty(),
        };
        if !has_input || !self.credentials.llm.is_present() {
            return Err(StudioError::validation(MISSING_SCRIPT_INPUT));
        }

        Ok(ScriptRequest {
            input_mode: s.input_mode,
            topic: s.topic.clone(),
            content: s.content.clone(),
            language: s.language,
            duration: s.duration_minutes,
            speakers: s.speakers.as_slice().to_vec(),
            llm_api_key: self.credentials.llm.clone(),
        })
    }

    pub fn complete_script(&mut self, result: StudioResult<Vec<ScriptLine>>) -> StudioResult<()> {
        let script = self.record(result)?;
        if self.state.step != Step::Config {
            warn!("Discarding script response received in step {:?}", self.state.step);
            return Ok(());
        }
        if script.is_empty() {
            return self.record(Err(StudioError::postcondition("Backend returned an empty script.")));
        }
        info!("Script ready: {} lines", script.len());
        self.state.script = script;
        self.state.step = Step::Script;
        Ok(())
    }

    pub async fn generate_script(&mut self) -> StudioResult<()> {
        let request = self.prepare_script()?;
        let result = self.backend.generate_script(&request).await;
        self.complete_script(result)
    }

    // --- Line regeneration ---

    pub fn prepare_regeneration(&mut self, index: usize) -> StudioResult<RegenerationTicket> {
        self.state.error = None;
        let result = self.check_line(index).and_then(|_| {
            if self.credentials.llm.is_present() {
                Ok(())
            } else {
                Err(StudioError::validation(MISSING_LLM_KEY))
            }
        });
        self.record(result)?;

        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending_regenerations.insert(index, seq);
        debug!("Regeneration #{} issued for line {}", seq, index);

        Ok(RegenerationTicket {
            index,
            seq,
            request: RegenerateRequest {
                script: self.state.script.clone(),
                index,
                llm_api_key: self.credentials.llm.clone(),
                language: self.state.language,
            },
        })
    }

    /// Returns whether the response was applied. Responses superseded by a
    /// newer request for the same line, or arriving after the script left
    /// the editor, are dropped.
    pub fn complete_regeneration(
        &mut self,
        ticket: RegenerationTicket,
        result: StudioResult<String>,
    ) -> StudioResult<bool> {
        if self.pending_regenerations.get(&ticket.index) != Some(&ticket.seq) {
            debug!("Dropping stale regeneration #{} for line {}", ticket.seq, ticket.index);
            return Ok(false);
        }
        self.pending_regenerations.remove(&ticket.index);

        let text = self.record(result)?;
        if self.state.step != Step::Script || ticket.index >= self.state.script.len() {
            debug!("Dropping regeneration for line {}: script changed", ticket.index);
            return Ok(false);
        }
        self.state.script[ticket.index].text = text;
        Ok(true)
    }

    pub async fn regenerate_line(&mut self, index: usize) -> StudioResult<bool> {
        let ticket = self.prepare_regeneration(index)?;
        let result = self.backend.regenerate_line(&ticket.request).await;
        self.complete_regeneration(ticket, result)
    }

    // --- Audio synthesis ---

    /// Moves to `processing` before the request is sent.
    pub fn prepare_audio(&mut self) -> StudioResult<AudioRequest> {
        self.state.error = None;
        let result = self
            .require_step(Step::Script, "Generate a script before generating audio.")
            .and_then(|_| {
                if self.credentials.tts.is_present() {
                    Ok(())
                } else {
                    Err(StudioError::validation(MISSING_TTS_KEY))
                }
            });
        self.record(result)?;

        self.pending_regenerations.clear();
        self.state.step = Step::Processing;
        self.state.audio_url = None;
        self.state.audio_filename = None;

        Ok(AudioRequest {
            script: self.state.script.clone(),
            speakers: self.state.speakers.as_slice().to_vec(),
            channels: self.state.channels,
            fonada_api_key: self.credentials.tts.clone(),
        })
    }

    /// Lands in `done` on success and back in `script` on any failure.
    pub fn complete_audio(&mut self, result: StudioResult<AudioArtifact>) -> StudioResult<()> {
        if self.state.step != Step::Processing {
            warn!("Discarding audio response received in step {:?}", self.state.step);
            return Ok(());
        }
        match result {
            Ok(artifact) => {
                info!("Audio ready: {}", artifact.audio_url);
                self.state.audio_url = Some(artifact.audio_url);
                self.state.audio_filename = Some(artifact.filename);
                self.state.video_url = None;
                self.state.rss_url = None;
                self.state.is_video_generating = false;
                self.state.step = Step::Done;
                Ok(())
            }
            Err(e) => {
                self.state.step = Step::Script;
                self.record(Err(e))
            }
        }
    }

    pub async fn generate_audio(&mut self) -> StudioResult<()> {
        let request = self.prepare_audio()?;
        let result = self.backend.synthesize_audio(&request).await;
        self.complete_audio(result)
    }

    // --- Document upload ---

    pub fn prepare_upload(&mut self, filename: &str, bytes: Vec<u8>) -> StudioResult<DocumentUpload> {
        self.state.error = None;
        let result = self
            .require_step(Step::Config, "Documents can only be uploaded while configuring.")
            .and_then(|_| {
                DocumentKind::from_filename(filename)
                    .ok_or_else(|| StudioError::validation("Only PDF and TXT files are supported."))
            })
            .and_then(|kind| {
                if bytes.is_empty() {
                    Err(StudioError::validation("The selected file is empty."))
                } else {
                    Ok(kind)
                }
            });
        let kind = self.record(result)?;

        Ok(DocumentUpload {
            filename: filename.to_string(),
            kind,
            bytes,
        })
    }

    pub fn complete_upload(&mut self, result: StudioResult<String>) -> StudioResult<()> {
        let content = self.record(result)?;
        info!("Extracted {} characters from document", content.chars().count());
        self.state.content = content;
        self.state.input_mode = InputMode::Upload;
        Ok(())
    }

    pub async fn upload_document(&mut self, filename: &str, bytes: Vec<u8>) -> StudioResult<()> {
        let document = self.prepare_upload(filename, bytes)?;
        let result = self.backend.upload_document(&document).await;
        self.complete_upload(result)
    }

    // --- Navigation ---

    /// `script -> config`. The script is dropped so that `config` always
    /// means "no script yet".
    pub fn back_to_config(&mut self) -> StudioResult<()> {
        let result = self.require_step(Step::Script, "Nothing to go back from.");
        self.record(result)?;
        self.pending_regenerations.clear();
        self.state.script.clear();
        self.state.step = Step::Config;
        self.state.error = None;
        Ok(())
    }

    /// `done -> script`, keeping the script as it was synthesized.
    pub fn edit_script_again(&mut self) -> StudioResult<()> {
        let result = self.require_step(Step::Done, "There is no finished podcast to edit.");
        self.record(result)?;
        self.state.is_video_generating = false;
        self.state.step = Step::Script;
        self.state.error = None;
        Ok(())
    }

    /// `done -> config` with a fresh topic, content, script and artifacts.
    /// Credentials, language, speakers and audio settings are kept.
    pub fn generate_another(&mut self) -> StudioResult<()> {
        let result = self.require_step(Step::Done, "Finish the current podcast first.");
        self.record(result)?;

        let previous = std::mem::take(&mut self.state);
        self.state = WorkflowState {
            input_mode: previous.input_mode,
            language: previous.language,
            duration_minutes: previous.duration_minutes,
            channels: previous.channels,
            speakers: previous.speakers,
            ..WorkflowState::default()
        };
        self.pending_regenerations.clear();
        Ok(())
    }

    // --- Publishing ---

    pub fn select_platform(&mut self, platform: PublishPlatform) -> StudioResult<()> {
        let result = self.require_step(Step::Done, NOT_PUBLISHABLE);
        self.record(result)?;
        self.state.publish_platform = platform;
        Ok(())
    }

    pub fn set_publish_details(&mut self, details: PublishDetails) {
        self.state.publish = details;
    }

    /// Title from the publishing form, else the topic, else a fixed default.
    pub fn episode_title(&self) -> String {
        let title = self.state.publish.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        let topic = self.state.topic.trim();
        if !topic.is_empty() {
            return topic.to_string();
        }
        DEFAULT_TITLE.to_string()
    }

    fn published_audio(&self) -> StudioResult<(String, String)> {
        self.require_step(Step::Done, NOT_PUBLISHABLE)?;
        match (&self.state.audio_url, &self.state.audio_filename) {
            (Some(url), Some(filename)) => Ok((url.clone(), filename.clone())),
            _ => Err(StudioError::validation(NOT_PUBLISHABLE)),
        }
    }

    pub fn prepare_video(&mut self) -> StudioResult<VideoTicket> {
        self.state.error = None;
        let result = self.published_audio().and_then(|audio| {
            if self.state.is_video_generating {
                Err(StudioError::validation("A video is already being generated."))
            } else {
                Ok(audio)
            }
        });
        let (_, audio_filename) = self.record(result)?;

        self.state.publish_platform = PublishPlatform::Youtube;
        self.state.is_video_generating = true;
        self.state.video_url = None;

        Ok(VideoTicket {
            request: VideoRequest {
                audio_filename: audio_filename.clone(),
                title: self.episode_title(),
            },
            audio_filename,
        })
    }

    /// Returns whether the response was applied. A render finishing after the
    /// user moved on from this audio is ignored.
    pub fn complete_video(
        &mut self,
        ticket: VideoTicket,
        result: StudioResult<String>,
    ) -> StudioResult<bool> {
        let current = self.state.step == Step::Done
            && self.state.audio_filename.as_deref() == Some(ticket.audio_filename.as_str());
        if !current {
            debug!("Ignoring video for {}", ticket.audio_filename);
            return Ok(false);
        }

        self.state.is_video_generating = false;
        let video_url = self.record(result)?;
        info!("Video ready: {}", video_url);
        self.state.video_url = Some(video_url);
        Ok(true)
    }

    pub async fn render_video(&mut self) -> StudioResult<bool> {
        let ticket = self.prepare_video()?;
        let result = self.backend.render_video(&ticket.request).await;
        self.complete_video(ticket, result)
    }

    pub fn prepare_rss(&mut self) -> StudioResult<RssRequest> {
        self.state.error = None;
        let result = self.published_audio().and_then(|audio| {
            let email = self.state.publish.email.trim();
            if email.is_empty() || !email.contains('@') {
                Err(StudioError::validation(INVALID_EMAIL))
            } else {
                Ok(audio)
            }
        });
        let (audio_url, filename) = self.record(result)?;

        self.state.publish_platform = PublishPlatform::Spotify;
        self.state.rss_url = None;

        Ok(RssRequest {
            title: self.episode_title(),
            description: self.state.publish.description.clone(),
            audio_url,
            filename,
            email: self.state.publish.email.trim().to_string(),
        })
    }

    pub fn complete_rss(&mut self, result: StudioResult<String>) -> StudioResult<()> {
        let rss_url = self.record(result)?;
        if self.state.step != Step::Done {
            debug!("Ignoring RSS feed received in step {:?}", self.state.step);
            return Ok(());
        }
        info!("RSS feed ready: {}", rss_url);
        self.state.rss_url = Some(rss_url);
        Ok(())
    }

    pub async fn publish_rss(&mut self) -> StudioResult<()> {
        let request = self.prepare_rss()?;
        let result = self.backend.publish_rss(&request).await;
        self.complete_rss(result)
    }
}
