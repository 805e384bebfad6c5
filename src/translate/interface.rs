use serde::{Deserialize, Serialize};

/// Body of `POST /api/translate`.
///
/// Fields are optional on the wire so that a missing field is reported as a
/// validation failure rather than a deserialization error.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    /// Echo of the input so clients can show both side by side.
    pub original_text: String,
}
