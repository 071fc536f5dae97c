use crate::core::catalog::Language;
use crate::core::config::backend_base_url;
use crate::core::error::{StudioError, StudioResult};
use crate::core::state::{ApiKey, Channels, ChatMessage, InputMode, ScriptLine, Speaker};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const MISSING_AUDIO_URL: &str = "Backend returned success but no audio URL.";

// --- Requests ---

#[derive(Serialize, Clone, Debug)]
pub struct ScriptRequest {
    pub input_mode: InputMode,
    pub topic: String,
    pub content: String,
    pub language: Language,
    pub duration: u32,
    pub speakers: Vec<Speaker>,
    pub llm_api_key: ApiKey,
}

#[derive(Serialize, Clone, Debug)]
pub struct RegenerateRequest {
    pub script: Vec<ScriptLine>,
    pub index: usize,
    pub llm_api_key: ApiKey,
    pub language: Language,
}

#[derive(Serialize, Clone, Debug)]
pub struct AudioRequest {
    pub script: Vec<ScriptLine>,
    pub speakers: Vec<Speaker>,
    pub channels: Channels,
    pub fonada_api_key: ApiKey,
}

/// Sent as multipart form fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoRequest {
    pub audio_filename: String,
    pub title: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RssRequest {
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub filename: String,
    pub email: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct BrainstormRequest {
    pub history: Vec<ChatMessage>,
    pub user_input: String,
    pub llm_api_key: ApiKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Text => "text/plain",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DocumentUpload {
    pub filename: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

// --- Results ---

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioArtifact {
    pub audio_url: String,
    pub filename: String,
}

// --- Backend contract ---

/// One method per backend operation. Each call is a single request with no
/// retries; errors carry the message to show the user.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn generate_script(&self, request: &ScriptRequest) -> StudioResult<Vec<ScriptLine>>;
    async fn regenerate_line(&self, request: &RegenerateRequest) -> StudioResult<String>;
    async fn synthesize_audio(&self, request: &AudioRequest) -> StudioResult<AudioArtifact>;
    async fn upload_document(&self, document: &DocumentUpload) -> StudioResult<String>;
    async fn render_video(&self, request: &VideoRequest) -> StudioResult<String>;
    async fn publish_rss(&self, request: &RssRequest) -> StudioResult<String>;
    async fn brainstorm(&self, request: &BrainstormRequest) -> StudioResult<String>;
}

// --- Failure mapping ---

/// Endpoint plus how its failures are reported.
struct Operation {
    path: &'static str,
    fallback: &'static str,
    use_detail: bool,
    surface_transport: bool,
}

const GENERATE_SCRIPT: Operation = Operation {
    path: "generate-script",
    fallback: "Script generation failed.",
    use_detail: true,
    surface_transport: false,
};

const REGENERATE_LINE: Operation = Operation {
    path: "regenerate-script-part",
    fallback: "Regeneration failed.",
    use_detail: false,
    surface_transport: false,
};

const SYNTHESIZE_AUDIO: Operation = Operation {
    path: "audio-from-script",
    fallback: "Audio generation failed.",
    use_detail: true,
    surface_transport: true,
};

const UPLOAD_DOCUMENT: Operation = Operation {
    path: "upload-content",
    fallback: "Document upload failed.",
    use_detail: true,
    surface_transport: true,
};

const RENDER_VIDEO: Operation = Operation {
    path: "create-video",
    fallback: "Video generation failed.",
    use_detail: true,
    surface_transport: false,
};

const PUBLISH_RSS: Operation = Operation {
    path: "publish-to-rss",
    fallback: "Failed to publish to RSS.",
    use_detail: true,
    surface_transport: false,
};

const BRAINSTORM: Operation = Operation {
    path: "brainstorm-topic",
    fallback: "Brainstorm failed.",
    use_detail: true,
    surface_transport: false,
};

impl Operation {
    fn transport_error(&self, err: reqwest::Error) -> StudioError {
        warn!("{} request failed: {}", self.path, err);
        if self.surface_transport {
            StudioError::gateway(err.to_string())
        } else {
            StudioError::gateway(self.fallback)
        }
    }

    fn status_error(&self, status: StatusCode, body: &str) -> StudioError {
        warn!("{} returned {}", self.path, status);
        if self.use_detail {
            if let Some(detail) = detail_message(body) {
                return StudioError::gateway(detail);
            }
        }
        StudioError::gateway(self.fallback)
    }

    fn decode<T: DeserializeOwned>(&self, body: &str) -> StudioResult<T> {
        serde_json::from_str(body).map_err(|e| {
            warn!("{} response is not valid JSON: {}", self.path, e);
            StudioError::gateway(self.fallback)
        })
    }
}

/// Extracts a FastAPI-style `{"detail": "..."}` message. Structured details
/// (validation error lists) are not shown to the user.
pub fn detail_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<serde_json::Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

// --- Responses ---

#[derive(Deserialize, Debug)]
struct ScriptResponse {
    script: Option<Vec<ScriptLine>>,
}

#[derive(Deserialize, Debug)]
struct RegenerateResponse {
    new_text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AudioResponse {
    audio_url: Option<String>,
    filename: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UploadResponse {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct VideoResponse {
    video_url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RssResponse {
    rss_url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BrainstormResponse {
    response: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn script_from(resp: ScriptResponse) -> StudioResult<Vec<ScriptLine>> {
    match resp.script {
        Some(script) if !script.is_empty() => Ok(script),
        _ => Err(StudioError::postcondition("Backend returned an empty script.")),
    }
}

fn new_text_from(resp: RegenerateResponse) -> StudioResult<String> {
    resp.new_text
        .ok_or_else(|| StudioError::postcondition(REGENERATE_LINE.fallback))
}

fn audio_from(resp: AudioResponse) -> StudioResult<AudioArtifact> {
    let audio_url =
        non_empty(resp.audio_url).ok_or_else(|| StudioError::postcondition(MISSING_AUDIO_URL))?;

    // Older backends omit the filename; it is the last path segment of the URL.
    let filename = match non_empty(resp.filename) {
        Some(f) => f,
        None => filename_from_url(&audio_url).ok_or_else(|| {
            StudioError::postcondition("Backend returned success but no audio filename.")
        })?,
    };

    Ok(AudioArtifact { audio_url, filename })
}

fn filename_from_url(audio_url: &str) -> Option<String> {
    let url = Url::parse(audio_url).ok()?;
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(last.to_string())
}

fn content_from(resp: UploadResponse) -> StudioResult<String> {
    resp.content
        .ok_or_else(|| StudioError::postcondition("Backend returned no document content."))
}

fn video_url_from(resp: VideoResponse) -> StudioResult<String> {
    non_empty(resp.video_url)
        .ok_or_else(|| StudioError::postcondition("Backend returned success but no video URL."))
}

fn rss_url_from(resp: RssResponse) -> StudioResult<String> {
    non_empty(resp.rss_url)
        .ok_or_else(|| StudioError::postcondition("Backend returned success but no RSS feed URL."))
}

fn reply_from(resp: BrainstormResponse) -> StudioResult<String> {
    resp.response
        .ok_or_else(|| StudioError::postcondition(BRAINSTORM.fallback))
}

// --- HTTP implementation ---

pub struct HttpGateway {
    base: Url,
    client: Client,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base, client })
    }

    /// Gateway for the origin selected at build time.
    pub fn for_build() -> Result<Self> {
        Self::new(backend_base_url())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, op: &Operation) -> StudioResult<Url> {
        self.base.join(op.path).map_err(|e| {
            warn!("Cannot build URL for {}: {}", op.path, e);
            StudioError::gateway(op.fallback)
        })
    }

    async fn send(&self, op: &Operation, request: RequestBuilder) -> StudioResult<String> {
        let resp = request.send().await.map_err(|e| op.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| op.transport_error(e))?;
        if !status.is_success() {
            return Err(op.status_error(status, &body));
        }
        debug!("{} -> {} ({} bytes)", op.path, status, body.len());
        Ok(body)
    }

    async fn post_json<B, T>(&self, op: &Operation, body: &B) -> StudioResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(op)?;
        let text = self.send(op, self.client.post(url).json(body)).await?;
        op.decode(&text)
    }

    async fn post_form<T>(&self, op: &Operation, form: multipart::Form) -> StudioResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(op)?;
        let text = self.send(op, self.client.post(url).multipart(form)).await?;
        op.decode(&text)
    }
}

#[async_trait]
impl Backend for HttpGateway {
    async fn generate_script(&self, request: &ScriptRequest) -> StudioResult<Vec<ScriptLine>> {
        info!(
            "Requesting script: mode={:?}, language={}, {} min, {} speakers",
            request.input_mode,
            request.language,
            request.duration,
            request.speakers.len()
        );
        let resp: ScriptResponse = self.post_json(&GENERATE_SCRIPT, request).await?;
        script_from(resp)
    }

    async fn regenerate_line(&self, request: &RegenerateRequest) -> StudioResult<String> {
        info!("Regenerating line {} of {}", request.index, request.script.len());
        let resp: RegenerateResponse = self.post_json(&REGENERATE_LINE, request).await?;
        new_text_from(resp)
    }

    async fn synthesize_audio(&self, request: &AudioRequest) -> StudioResult<AudioArtifact> {
        info!(
            "Synthesizing {} lines with {} speakers ({:?})",
            request.script.len(),
            request.speakers.len(),
            request.channels
        );
        let resp: AudioResponse = self.post_json(&SYNTHESIZE_AUDIO, request).await?;
        audio_from(resp)
    }

    async fn upload_document(&self, document: &DocumentUpload) -> StudioResult<String> {
        info!("Uploading {} ({} bytes)", document.filename, document.bytes.len());
        let part = multipart::Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(document.kind.mime())
            .map_err(|e| StudioError::gateway(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);
        let resp: UploadResponse = self.post_form(&UPLOAD_DOCUMENT, form).await?;
        content_from(resp)
    }

    async fn render_video(&self, request: &VideoRequest) -> StudioResult<String> {
        info!("Rendering video for {}", request.audio_filename);
        let form = multipart::Form::new()
            .text("audio_filename", request.audio_filename.clone())
            .text("title", request.title.clone());
        let resp: VideoResponse = self.post_form(&RENDER_VIDEO, form).await?;
        video_url_from(resp)
    }

    async fn publish_rss(&self, request: &RssRequest) -> StudioResult<String> {
        info!("Publishing {} to RSS", request.filename);
        let resp: RssResponse = self.post_json(&PUBLISH_RSS, request).await?;
        rss_url_from(resp)
    }

    async fn brainstorm(&self, request: &BrainstormRequest) -> StudioResult<String> {
        debug!("Brainstorming with {} prior messages", request.history.len());
        let resp: BrainstormResponse = self.post_json(&BRAINSTORM, request).await?;
        reply_from(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message_extraction() {
        assert_eq!(
            detail_message(r#"{"detail": "Fonada TTS error: quota"}"#).as_deref(),
            Some("Fonada TTS error: quota")
        );
        assert_eq!(detail_message(r#"{"detail": [{"loc": ["body"], "msg": "x"}]}"#), None);
        assert_eq!(detail_message(r#"{"detail": "  "}"#), None);
        assert_eq!(detail_message("Internal Server Error"), None);
        assert_eq!(detail_message("[1, 2]"), None);
    }

    #[test]
    fn test_status_error_prefers_detail_when_allowed() {
        let body = r#"{"detail": "Invalid API key"}"#;
        assert_eq!(
            GENERATE_SCRIPT.status_error(StatusCode::INTERNAL_SERVER_ERROR, body),
            StudioError::gateway("Invalid API key")
        );
        assert_eq!(
            REGENERATE_LINE.status_error(StatusCode::INTERNAL_SERVER_ERROR, body),
            StudioError::gateway("Regeneration failed.")
        );
        assert_eq!(
            PUBLISH_RSS.status_error(StatusCode::BAD_GATEWAY, "<html>"),
            StudioError::gateway("Failed to publish to RSS.")
        );
    }

    #[test]
    fn test_audio_without_url_is_a_postcondition_failure() {
        let resp: AudioResponse = SYNTHESIZE_AUDIO.decode("{}").unwrap();
        assert_eq!(
            audio_from(resp),
            Err(StudioError::postcondition(MISSING_AUDIO_URL))
        );

        let resp: AudioResponse = SYNTHESIZE_AUDIO.decode(r#"{"audio_url": ""}"#).unwrap();
        assert!(matches!(audio_from(resp), Err(StudioError::Postcondition(_))));
    }

    #[test]
    fn test_audio_filename_falls_back_to_url_segment() {
        let resp: AudioResponse = SYNTHESIZE_AUDIO
            .decode(r#"{"message": "ok", "audio_url": "http://localhost:8000/audio/podcast_abc.mp3"}"#)
            .unwrap();
        let artifact = audio_from(resp).unwrap();
        assert_eq!(artifact.filename, "podcast_abc.mp3");

        let resp: AudioResponse = SYNTHESIZE_AUDIO
            .decode(r#"{"audio_url": "http://x/audio/a.mp3", "filename": "given.mp3"}"#)
            .unwrap();
        assert_eq!(audio_from(resp).unwrap().filename, "given.mp3");
    }

    #[test]
    fn test_empty_script_is_rejected() {
        let resp: ScriptResponse = GENERATE_SCRIPT.decode(r#"{"script": []}"#).unwrap();
        assert!(matches!(script_from(resp), Err(StudioError::Postcondition(_))));

        let resp: ScriptResponse = GENERATE_SCRIPT
            .decode(r#"{"script": [{"speaker": "Host", "text": "Namaste"}]}"#)
            .unwrap();
        assert_eq!(script_from(resp).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_body_maps_to_fallback() {
        let err = RENDER_VIDEO.decode::<VideoResponse>("not json").unwrap_err();
        assert_eq!(err, StudioError::gateway("Video generation failed."));
    }

    #[test]
    fn test_request_bodies_use_backend_field_names() {
        let request = AudioRequest {
            script: vec![ScriptLine { speaker: "Host".into(), text: "Hi".into() }],
            speakers: vec![Speaker::new("Host", Language::Hindi)],
            channels: Channels::Stereo,
            fonada_api_key: ApiKey::new("tts"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["channels"], "stereo");
        assert_eq!(json["fonada_api_key"], "tts");
        assert_eq!(json["speakers"][0]["language"], "Hindi");

        let request = ScriptRequest {
            input_mode: InputMode::Topic,
            topic: "AI in Agriculture".into(),
            content: String::new(),
            language: Language::EnglishMix,
            duration: 2,
            speakers: vec![],
            llm_api_key: ApiKey::new("llm"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input_mode"], "topic");
        assert_eq!(json["language"], "English (Mix)");
        assert_eq!(json["llm_api_key"], "llm");
    }

    #[test]
    fn test_document_kind_from_extension() {
        assert_eq!(DocumentKind::from_filename("notes.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("a/b/c.txt"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_filename("slides.pptx"), None);
        assert_eq!(DocumentKind::from_filename("README"), None);
    }

    #[test]
    fn test_base_url_joins_endpoints() {
        let gateway = HttpGateway::new("http://example.com/api").unwrap();
        let url = gateway.endpoint(&GENERATE_SCRIPT).unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/generate-script");
        assert!(HttpGateway::new("not a url").is_err());
    }
}
