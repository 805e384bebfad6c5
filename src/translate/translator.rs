use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::interface::{TranslationRequest, TranslationResult};
use crate::config::PromptConfig;
use crate::error::GatewayError;
use crate::provider::{with_deadline, ChatMessage, ChatRequest, CompletionProvider};

pub const MISSING_FIELDS: &str = "Missing text or targetLanguage";

/// Source language used in the instruction when the caller gave none.
const AUTO_DETECT: &str = "auto";

/// Medical text translation over a chat completion.
pub struct Translator {
    provider: Arc<dyn CompletionProvider>,
    template: String,
    temperature: f32,
    deadline: Duration,
}

impl Translator {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompts: &PromptConfig, deadline: Duration) -> Self {
        Self {
            provider,
            template: prompts.translation_system.clone(),
            temperature: prompts.translation_temperature,
            deadline,
        }
    }

    pub async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, GatewayError> {
        let text = non_empty(request.text).ok_or_else(|| GatewayError::validation(MISSING_FIELDS))?;
        let target = non_empty(request.target_language)
            .ok_or_else(|| GatewayError::validation(MISSING_FIELDS))?;
        let source = non_empty(request.source_language);

        let instruction = render_instruction(&self.template, source.as_deref(), &target);
        debug!(
            "Translating {} chars from {} to {}",
            text.chars().count(),
            source.as_deref().unwrap_or(AUTO_DETECT),
            target
        );

        let completion = with_deadline(
            self.deadline,
            self.provider.chat_completion(ChatRequest {
                messages: vec![ChatMessage::system(instruction), ChatMessage::user(text.clone())],
                temperature: self.temperature,
                json_mode: false,
            }),
        )
        .await?;

        Ok(TranslationResult {
            translated_text: completion.trim().to_string(),
            original_text: text,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Fill `{source_language}` and `{target_language}` in the instruction template.
pub fn render_instruction(template: &str, source: Option<&str>, target: &str) -> String {
    template
        .replace("{source_language}", source.unwrap_or(AUTO_DETECT))
        .replace("{target_language}", target)
}
