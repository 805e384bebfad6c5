use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::interface::{AudioFile, ChatMessage, ChatRequest, CompletionProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// OpenAI-compatible provider talking to `/chat/completions` and
/// `/audio/transcriptions`.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    api_key: String,
    organization_id: Option<String>,
    chat_model: String,
    transcription_model: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAIProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().build()?;
        info!(
            "Initialized OpenAIProvider: base_url={}, chat_model={}, transcription_model={}",
            config.base_url, config.chat_model, config.transcription_model
        );
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            organization_id: config.organization_id.clone(),
            chat_model: config.chat_model.clone(),
            transcription_model: config.transcription_model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.bearer_auth(&self.api_key);
        match &self.organization_id {
            Some(org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }
}

/// Pass 2xx responses through; turn anything else into `ProviderError::Api`
/// carrying the provider's own message when it sent one.
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn chat_completion(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionBody {
            model: &self.chat_model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        debug!(
            "Chat completion: model={}, turns={}, json_mode={}",
            self.chat_model,
            request.messages.len(),
            request.json_mode
        );

        let response = self
            .authorize(self.client.post(self.url("chat/completions")))
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletionResponse = check_status(response).await?.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::EmptyResponse("no message content in first choice".to_string()))
    }

    async fn transcribe(&self, audio: AudioFile<'_>) -> Result<String, ProviderError> {
        let file = tokio::fs::File::open(audio.path).await?;
        let length = file.metadata().await?.len();

        debug!(
            "Transcription: model={}, file={}, bytes={}",
            self.transcription_model, audio.file_name, length
        );

        let mut part = Part::stream_with_length(file, length).file_name(audio.file_name.to_string());
        if let Some(content_type) = audio.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("model", self.transcription_model.clone());

        let response = self
            .authorize(self.client.post(self.url("audio/transcriptions")))
            .multipart(form)
            .send()
            .await?;
        let transcription: TranscriptionResponse = check_status(response).await?.json().await?;
        Ok(transcription.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAIProvider {
        OpenAIProvider::new(&ProviderConfig {
            api_key: "sk-test".to_string(),
            base_url: format!("{}/v1/", server.uri()),
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn chat_completion_sends_model_turns_and_json_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    { "role": "system", "content": "be terse" },
                    { "role": "user", "content": "hi" }
                ],
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"ok\":true}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server)
            .chat_completion(ChatRequest {
                messages: vec![ChatMessage::system("be terse"), ChatMessage::user("hi")],
                temperature: 0.5,
                json_mode: true,
            })
            .await
            .unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn plain_completion_omits_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "  Hola \n" } }]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let text = provider
            .chat_completion(ChatRequest {
                messages: vec![ChatMessage::user("Hello")],
                temperature: 0.3,
                json_mode: false,
            })
            .await
            .unwrap();
        // trimming is the translator's job, the provider returns content as-is
        assert_eq!(text, "  Hola \n");

        let received = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(sent.get("response_format").is_none());
    }

    #[tokio::test]
    async fn api_errors_surface_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .chat_completion(ChatRequest {
                messages: vec![ChatMessage::user("x")],
                temperature: 0.3,
                json_mode: false,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "401 Incorrect API key provided");
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .chat_completion(ChatRequest {
                messages: vec![ChatMessage::user("x")],
                temperature: 0.3,
                json_mode: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn transcription_uploads_file_and_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "text": "patient reports fever" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("staged");
        std::fs::write(&audio_path, b"RIFF....WAVEfmt ").unwrap();

        let text = provider_for(&server)
            .transcribe(AudioFile {
                path: &audio_path,
                file_name: "visit.wav",
                content_type: Some("audio/wav"),
            })
            .await
            .unwrap();
        assert_eq!(text, "patient reports fever");

        let received = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&received[0].body).to_string();
        assert!(body.contains("name=\"file\"; filename=\"visit.wav\""));
        assert!(body.contains("name=\"model\""));
        assert!(body.contains("whisper-1"));
        assert!(body.contains("RIFF....WAVEfmt "));
    }

    #[tokio::test]
    async fn transcription_error_body_without_envelope_is_passed_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway upstream"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("staged");
        std::fs::write(&audio_path, b"abc").unwrap();

        let err = provider_for(&server)
            .transcribe(AudioFile {
                path: &audio_path,
                file_name: "a.webm",
                content_type: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "502 bad gateway upstream");
    }
}
