use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::interface::{AudioFile, ChatRequest, CompletionProvider};
use crate::error::ProviderError;

/// Canned behaviour for one kind of upstream call.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail { status: u16, message: String },
    Hang,
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    pub fn fail(status: u16, message: &str) -> Self {
        Reply::Fail {
            status,
            message: message.to_string(),
        }
    }

    async fn play(&self) -> Result<String, ProviderError> {
        match self {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail { status, message } => Err(ProviderError::Api {
                status: *status,
                message: message.clone(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::EmptyResponse("hang finished".to_string()))
            }
        }
    }
}

/// Provider double that records every call it receives.
pub struct MockProvider {
    chat_reply: Reply,
    transcription_reply: Reply,
    chat_requests: Mutex<Vec<ChatRequest>>,
    transcribe_calls: AtomicUsize,
    /// Paths handed to `transcribe`, with whether the file existed at call time.
    seen_uploads: Mutex<Vec<(PathBuf, bool, String)>>,
}

impl MockProvider {
    pub fn new(chat_reply: Reply, transcription_reply: Reply) -> Self {
        Self {
            chat_reply,
            transcription_reply,
            chat_requests: Mutex::new(Vec::new()),
            transcribe_calls: AtomicUsize::new(0),
            seen_uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn chat(reply: Reply) -> Self {
        Self::new(reply, Reply::text(""))
    }

    pub fn transcription(reply: Reply) -> Self {
        Self::new(Reply::text(""), reply)
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }

    pub fn transcribe_calls(&self) -> usize {
        self.transcribe_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.chat_calls() + self.transcribe_calls()
    }

    pub fn seen_uploads(&self) -> Vec<(PathBuf, bool, String)> {
        self.seen_uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn chat_completion(&self, request: ChatRequest) -> Result<String, ProviderError> {
        self.chat_requests.lock().unwrap().push(request);
        self.chat_reply.play().await
    }

    async fn transcribe(&self, audio: AudioFile<'_>) -> Result<String, ProviderError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        let contents = std::fs::read_to_string(audio.path).unwrap_or_default();
        self.seen_uploads.lock().unwrap().push((
            audio.path.to_path_buf(),
            audio.path.exists(),
            contents,
        ));
        self.transcription_reply.play().await
    }
}
