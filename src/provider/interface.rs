use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One role-tagged turn sent to a chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Constrain the reply to a syntactically valid JSON object.
    pub json_mode: bool,
}

/// Audio staged on disk, ready to be streamed upstream.
#[derive(Debug, Clone, Copy)]
pub struct AudioFile<'a> {
    pub path: &'a Path,
    /// Name reported to the provider; its extension is how the format gets detected.
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
}

/// Interface for the upstream completion / speech-to-text service.
///
/// Implementations hold no per-request state and are shared across all
/// in-flight requests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a chat completion and return the generated text of the first choice.
    async fn chat_completion(&self, request: ChatRequest) -> Result<String, ProviderError>;

    /// Transcribe an audio file and return the plain-text transcript.
    async fn transcribe(&self, audio: AudioFile<'_>) -> Result<String, ProviderError>;
}
