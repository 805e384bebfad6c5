use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::interface::{ConversationMessage, SummaryResult};
use crate::config::PromptConfig;
use crate::error::GatewayError;
use crate::provider::{with_deadline, ChatMessage, ChatRequest, CompletionProvider};

pub const INVALID_MESSAGES: &str = "Invalid messages format";

/// Structured extraction of a doctor-patient conversation.
pub struct Summarizer {
    provider: Arc<dyn CompletionProvider>,
    instruction: String,
    temperature: f32,
    strict_schema: bool,
    deadline: Duration,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompts: &PromptConfig, deadline: Duration) -> Self {
        Self {
            provider,
            instruction: prompts.summary_system.clone(),
            temperature: prompts.summary_temperature,
            strict_schema: prompts.strict_summary_schema,
            deadline,
        }
    }

    /// Summarize the conversation and return the model's JSON object as parsed,
    /// key order included.
    pub async fn summarize(&self, messages: &[ConversationMessage]) -> Result<Value, GatewayError> {
        let transcript = flatten_transcript(messages);
        debug!("Summarizing {} turns", messages.len());

        let completion = with_deadline(
            self.deadline,
            self.provider.chat_completion(ChatRequest {
                messages: vec![
                    ChatMessage::system(self.instruction.clone()),
                    ChatMessage::user(transcript),
                ],
                temperature: self.temperature,
                json_mode: true,
            }),
        )
        .await?;

        let summary: Value = serde_json::from_str(&completion).map_err(|e| {
            GatewayError::MalformedOutput(format!("Provider returned invalid JSON: {e}"))
        })?;
        if !summary.is_object() {
            return Err(GatewayError::MalformedOutput(
                "Provider returned JSON that is not an object".to_string(),
            ));
        }
        if self.strict_schema {
            serde_json::from_value::<SummaryResult>(summary.clone()).map_err(|e| {
                GatewayError::MalformedOutput(format!("Summary does not match schema: {e}"))
            })?;
        }

        Ok(summary)
    }
}

/// Check that `messages` is an array. Its entries are taken as they come.
pub fn parse_messages(messages: Option<Value>) -> Result<Vec<ConversationMessage>, GatewayError> {
    match messages {
        Some(Value::Array(entries)) => Ok(entries.iter().map(ConversationMessage::from_entry).collect()),
        _ => Err(GatewayError::validation(INVALID_MESSAGES)),
    }
}

/// `role: text`, one line per turn, in the order given.
pub fn flatten_transcript(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.sender_role, m.original_text))
        .collect::<Vec<_>>()
        .join("\n")
}
