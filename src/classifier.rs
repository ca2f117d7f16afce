//! Routing classifier: decides whether a conversation is about workouts,
//! nutrition, or neither.
//!
//! The model reply is treated as untrusted: it is mapped onto the closed
//! label set and anything unexpected (or no reply at all) becomes
//! [`ClassificationLabel::Neutral`].

use tracing::{debug, info, warn};

use crate::llm::{CompletionRequest, LlmGateway, LlmReply};
use crate::metrics::{LabelSource, PipelineMetrics};
use crate::models::{ClassificationLabel, Message, Role};
use crate::nlp;
use crate::utils::preview;

const CLASSIFIER_PROMPT: &str = "\
You route messages from a fitness-coaching chat. Read the conversation and answer with exactly one word:

workout   - the conversation creates or changes an exercise plan: exercises, sets, reps, weights, rest, training days.
nutrition - the conversation reports food eaten or sets food targets: meals, calories, protein, carbs, fat.
neutral   - anything else: greetings, motivation, general questions, small talk.

The conversation may be in English or Arabic (e.g. تمرين, مجموعات, تكرارات are workout; سعرات, بروتين, وجبة are nutrition).
Reply with only the word workout, nutrition or neutral. No punctuation, no explanation.";

/// Render turns as `User: ...` / `Assistant: ...` lines
pub fn render_transcript<'a>(turns: impl IntoIterator<Item = (Role, &'a str)>) -> String {
    turns
        .into_iter()
        .map(|(role, content)| format!("{}: {}", role.speaker(), content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render stored messages (oldest first) as a transcript
pub fn render_messages(messages: &[Message]) -> String {
    render_transcript(messages.iter().map(|m| (m.role, m.content.as_str())))
}

/// LLM-backed conversation classifier with an offline keyword fallback
#[derive(Clone)]
pub struct Classifier {
    gateway: LlmGateway,
}

impl Classifier {
    /// Create a classifier that calls the model through `gateway`
    pub const fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Classify one user/assistant exchange
    pub async fn classify_pair(&self, user_text: &str, assistant_text: &str) -> ClassificationLabel {
        let transcript = render_transcript([(Role::User, user_text), (Role::Assistant, assistant_text)]);
        self.classify_transcript(&transcript).await
    }

    /// Classify a window of messages ordered oldest first
    pub async fn classify_window(&self, messages: &[Message]) -> ClassificationLabel {
        if messages.is_empty() {
            return ClassificationLabel::Neutral;
        }
        self.classify_transcript(&render_messages(messages)).await
    }

    /// Classify without the model, by keyword counts
    #[must_use]
    pub fn classify_by_keyword(text: &str) -> ClassificationLabel {
        let label = nlp::classify_by_keyword(text);
        PipelineMetrics::record_classification(label, LabelSource::Keyword);
        label
    }

    async fn classify_transcript(&self, transcript: &str) -> ClassificationLabel {
        let request = CompletionRequest::new(CLASSIFIER_PROMPT, transcript);

        let label = match self.gateway.complete(&request).await {
            LlmReply::Text(reply) => {
                let label = ClassificationLabel::from_reply(&reply);
                if label == ClassificationLabel::Neutral && !reply.trim().eq_ignore_ascii_case("neutral") {
                    info!(reply = %preview(&reply), "Unrecognized classifier reply");
                }
                label
            }
            LlmReply::Empty => {
                debug!("Empty classifier reply");
                ClassificationLabel::Neutral
            }
            LlmReply::Unavailable(reason) => {
                warn!(%reason, "Classifier unavailable, defaulting to neutral");
                ClassificationLabel::Neutral
            }
        };

        PipelineMetrics::record_classification(label, LabelSource::Llm);
        debug!(%label, "Conversation classified");
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, Result};
    use crate::llm::CompletionClient;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use mockall::mock;
    use std::sync::Arc;
    use std::time::Duration;

    mock! {
        Client {}

        #[async_trait]
        impl CompletionClient for Client {
            async fn complete(&self, request: &CompletionRequest) -> Result<String>;
        }
    }

    fn classifier(client: MockClient) -> Classifier {
        Classifier::new(LlmGateway::new(
            Arc::new(client),
            Duration::from_secs(1),
            0,
            Duration::from_millis(1),
        ))
    }

    fn message(role: Role, content: &str) -> Message {
        Message {
            id: 1,
            user_id: 1,
            role,
            content: content.to_string(),
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_render_transcript() {
        let text = render_transcript([(Role::User, "hi"), (Role::Assistant, "hello")]);
        assert_eq!(text, "User: hi\nAssistant: hello");
    }

    #[tokio::test]
    async fn test_pair_sends_transcript_and_parses_label() {
        let mut client = MockClient::new();
        client
            .expect_complete()
            .withf(|request| {
                request.system_prompt.contains("workout")
                    && request.messages[0].content == "User: Add squats\nAssistant: Done, 3x5 squats"
            })
            .times(1)
            .returning(|_| Ok(" Workout\n".to_string()));

        let label = classifier(client).classify_pair("Add squats", "Done, 3x5 squats").await;
        assert_eq!(label, ClassificationLabel::Workout);
    }

    #[tokio::test]
    async fn test_unexpected_reply_is_neutral() {
        let mut client = MockClient::new();
        client
            .expect_complete()
            .returning(|_| Ok("This looks like nutrition to me".to_string()));

        assert_eq!(classifier(client).classify_pair("a", "b").await, ClassificationLabel::Neutral);
    }

    #[tokio::test]
    async fn test_failure_is_neutral() {
        let mut client = MockClient::new();
        client
            .expect_complete()
            .returning(|_| Err(PipelineError::Llm("down".to_string())));

        assert_eq!(classifier(client).classify_pair("a", "b").await, ClassificationLabel::Neutral);
    }

    #[tokio::test]
    async fn test_window() {
        let mut client = MockClient::new();
        client
            .expect_complete()
            .withf(|request| request.messages[0].content.starts_with("User: I ate rice"))
            .returning(|_| Ok("nutrition".to_string()));

        let window = [
            message(Role::User, "I ate rice"),
            message(Role::Assistant, "About 200 calories"),
        ];
        assert_eq!(classifier(client).classify_window(&window).await, ClassificationLabel::Nutrition);
    }

    #[tokio::test]
    async fn test_empty_window_skips_model() {
        let client = MockClient::new();
        assert_eq!(classifier(client).classify_window(&[]).await, ClassificationLabel::Neutral);
    }
}
