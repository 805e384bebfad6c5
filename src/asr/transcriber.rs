use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::interface::TranscriptionResult;
use super::upload::StagedUpload;
use crate::error::GatewayError;
use crate::provider::{with_deadline, CompletionProvider};

/// Speech-to-text over the provider's transcription call.
pub struct Transcriber {
    provider: Arc<dyn CompletionProvider>,
    deadline: Duration,
}

impl Transcriber {
    pub fn new(provider: Arc<dyn CompletionProvider>, deadline: Duration) -> Self {
        Self { provider, deadline }
    }

    /// Transcribe a staged upload. The upload is consumed, so the staged file
    /// is gone by the time this returns, on success and on failure alike.
    pub async fn transcribe(&self, upload: StagedUpload) -> Result<TranscriptionResult, GatewayError> {
        debug!("Transcribing {} ({} bytes)", upload.path().display(), upload.size());
        let outcome = with_deadline(self.deadline, self.provider.transcribe(upload.audio_file())).await;
        drop(upload);

        Ok(TranscriptionResult { text: outcome? })
    }
}
