use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One turn of the consultation, in chronological order, with both fields
/// already rendered as transcript text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationMessage {
    pub sender_role: String,
    pub original_text: String,
}

impl ConversationMessage {
    /// Read `senderRole` and `originalText` from one array entry. Entries are
    /// never rejected: absent fields (or a non-object entry) render as `""`.
    pub fn from_entry(entry: &Value) -> Self {
        Self {
            sender_role: render_field(entry.get("senderRole")),
            original_text: render_field(entry.get("originalText")),
        }
    }
}

/// Strings as written, anything else in its JSON form (`null`, `38.5`, `true`).
fn render_field(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Body of `POST /api/summarize`. `messages` is kept raw until it has been
/// checked to be an array.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub messages: Option<Value>,
}

/// The object the summary instruction asks the model for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryResult {
    pub summary: String,
    pub symptoms: Vec<String>,
    pub diagnoses: Vec<String>,
    pub medications: Vec<String>,
    pub followups: Vec<String>,
}
