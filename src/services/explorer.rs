use crate::core::error::{StudioError, StudioResult};
use crate::core::state::{ApiKey, ChatMessage};
use crate::services::gateway::{Backend, BrainstormRequest};
use crate::services::workflow::WorkflowController;
use log::{debug, warn};
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const CONNECTION_TROUBLE: &str = "Sorry, I'm having trouble connecting to the brain center.";

fn final_topic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)FINAL_TOPIC:\s*(.*)").expect("valid regex"))
}

/// Pulls the proposed topic out of a model reply ending in
/// `FINAL_TOPIC: <topic>`, stripping wrapping brackets, quotes and trailing
/// punctuation.
pub fn extract_final_topic(reply: &str) -> Option<String> {
    let caps = final_topic_pattern().captures(reply)?;
    let raw = caps.get(1)?.as_str().trim();
    let topic = raw
        .trim_end_matches(|c: char| matches!(c, '[' | ']' | '"' | '.' | '!' | '?'))
        .trim_start_matches(|c: char| matches!(c, '[' | ']' | '"') || c.is_whitespace())
        .trim();
    if topic.is_empty() {
        None
    } else {
        Some(topic.to_string())
    }
}

fn marker_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)FINAL_TOPIC:[^\n]*").expect("valid regex"))
}

/// Reply text with the marker line removed, for display. Text on the
/// following lines is kept.
pub fn display_text(content: &str) -> String {
    marker_line_pattern().replace(content, "").trim().to_string()
}

/// Brainstorming chat that can hand a topic back to the workflow. Its
/// history lives only as long as the explorer is open.
pub struct TopicExplorer {
    backend: Arc<dyn Backend>,
    history: Vec<ChatMessage>,
    suggested_topic: Option<String>,
}

impl TopicExplorer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            history: Vec::new(),
            suggested_topic: None,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn suggested_topic(&self) -> Option<&str> {
        self.suggested_topic.as_deref()
    }

    /// Appends the user's message and returns the request to send. The
    /// request carries the history as it was before this message.
    pub fn prepare_message(&mut self, input: &str, llm_key: &ApiKey) -> StudioResult<BrainstormRequest> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StudioError::validation("Type an idea to start brainstorming."));
        }
        if !llm_key.is_present() {
            return Err(StudioError::validation("Please provide Gemini API Key."));
        }

        let request = BrainstormRequest {
            history: self.history.clone(),
            user_input: input.to_string(),
            llm_api_key: llm_key.clone(),
        };
        self.history.push(ChatMessage::user(input));
        Ok(request)
    }

    /// Appends the model's reply (or an apology on failure). Returns the
    /// topic proposed by this reply, if any.
    pub fn complete_message(&mut self, result: StudioResult<String>) -> Option<String> {
        match result {
            Ok(reply) => {
                let topic = extract_final_topic(&reply);
                self.history.push(ChatMessage::model(reply));
                if let Some(t) = &topic {
                    debug!("Explorer proposed topic: {}", t);
                    self.suggested_topic = Some(t.clone());
                }
                topic
            }
            Err(e) => {
                warn!("Brainstorm failed: {}", e);
                self.history.push(ChatMessage::model(CONNECTION_TROUBLE));
                None
            }
        }
    }

    pub async fn send(&mut self, input: &str, llm_key: &ApiKey) -> StudioResult<Option<String>> {
        let request = self.prepare_message(input, llm_key)?;
        let result = self.backend.brainstorm(&request).await;
        Ok(self.complete_message(result))
    }

    /// Writes the suggested topic into the workflow and closes the explorer.
    /// Does nothing if there is no suggestion.
    pub fn apply(&mut self, workflow: &mut WorkflowController) -> Option<String> {
        let topic = self.suggested_topic.take()?;
        workflow.set_topic(topic.clone());
        self.close();
        Some(topic)
    }

    pub fn close(&mut self) {
        self.history.clear();
        self.suggested_topic = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{Role, WorkflowState};
    use crate::services::workflow::tests::MockBackend;

    #[test]
    fn test_extract_final_topic_variants() {
        assert_eq!(
            extract_final_topic("Great choice!\nFINAL_TOPIC: AI in Agriculture").as_deref(),
            Some("AI in Agriculture")
        );
        assert_eq!(
            extract_final_topic("final_topic:   \"[Millets and Monsoons]\".").as_deref(),
            Some("Millets and Monsoons")
        );
        assert_eq!(
            extract_final_topic("FINAL_TOPIC: Space Startups!?\nThanks").as_deref(),
            Some("Space Startups")
        );
        assert_eq!(extract_final_topic("How about cricket analytics?"), None);
        assert_eq!(extract_final_topic("FINAL_TOPIC: \"\""), None);
    }

    #[test]
    fn test_display_text_hides_marker() {
        assert_eq!(
            display_text("Let's go with it.\nFINAL_TOPIC: Rural Fintech"),
            "Let's go with it."
        );
        assert_eq!(
            display_text("Nice.\nFINAL_TOPIC:\nKeep this line\nBye"),
            "Nice.\n\nKeep this line\nBye"
        );
        assert_eq!(display_text("No marker here."), "No marker here.");
    }

    #[tokio::test]
    async fn test_history_and_suggestion_flow() {
        let backend = Arc::new(MockBackend::default());
        backend
            .replies
            .lock()
            .unwrap()
            .push_back(Ok("Maybe farming? Or fintech?".to_string()));
        backend
            .replies
            .lock()
            .unwrap()
            .push_back(Ok("Perfect.\nFINAL_TOPIC: \"AI in Agriculture\"".to_string()));
        let key = ApiKey::new("llm");
        let mut explorer = TopicExplorer::new(backend.clone());

        assert_eq!(explorer.send("I like tech", &key).await.unwrap(), None);
        let topic = explorer.send("Farming it is", &key).await.unwrap();

        assert_eq!(topic.as_deref(), Some("AI in Agriculture"));
        assert_eq!(explorer.history().len(), 4);
        assert_eq!(explorer.history()[3].role, Role::Model);

        let requests = backend.brainstorm_requests.lock().unwrap();
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[1].history.len(), 2);
        assert_eq!(requests[1].user_input, "Farming it is");
        drop(requests);

        let mut workflow = WorkflowController::new(WorkflowState::default(), backend.clone());
        assert_eq!(explorer.apply(&mut workflow).as_deref(), Some("AI in Agriculture"));
        assert_eq!(workflow.state().topic, "AI in Agriculture");
        assert!(explorer.history().is_empty());
        assert_eq!(explorer.apply(&mut workflow), None);
    }

    #[tokio::test]
    async fn test_failure_appends_apology_and_blank_input_sends_nothing() {
        let backend = Arc::new(MockBackend::default());
        backend
            .replies
            .lock()
            .unwrap()
            .push_back(Err(StudioError::gateway("Brainstorm failed.")));
        let mut explorer = TopicExplorer::new(backend.clone());

        assert!(explorer.send("   ", &ApiKey::new("llm")).await.is_err());
        assert!(explorer.send("ideas", &ApiKey::new("")).await.is_err());
        assert_eq!(backend.call_count(), 0);
        assert!(explorer.history().is_empty());

        assert_eq!(explorer.send("ideas", &ApiKey::new("llm")).await.unwrap(), None);
        assert_eq!(explorer.history()[1].content, CONNECTION_TROUBLE);
        assert_eq!(explorer.suggested_topic(), None);
    }
}
