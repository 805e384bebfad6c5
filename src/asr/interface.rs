use serde::{Deserialize, Serialize};

/// Body returned by `POST /api/transcribe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
}
