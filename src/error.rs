use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a call to the upstream language-model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("{status} {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream call exceeded its deadline of {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("upstream response had no content: {0}")]
    EmptyResponse(String),

    #[error("failed to read upload for upstream call: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a translate/transcribe/summarize operation can fail with.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller input was missing or malformed. The provider was not contacted.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider replied, but not with the structured output that was asked for.
    #[error("{0}")]
    MalformedOutput(String),

    /// Staging the upload on local storage failed.
    #[error("{0}")]
    Storage(String),
}

impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short name of the failure kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation",
            GatewayError::Provider(ProviderError::Timeout(_)) => "provider_timeout",
            GatewayError::Provider(_) => "provider",
            GatewayError::MalformedOutput(_) => "malformed_output",
            GatewayError::Storage(_) => "storage",
        }
    }
}

/// The three public operations; each has its own failure wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Translate,
    Transcribe,
    Summarize,
}

impl Endpoint {
    pub fn failure_message(self) -> &'static str {
        match self {
            Endpoint::Translate => "Translation failed",
            Endpoint::Transcribe => "Transcription failed",
            Endpoint::Summarize => "Summarization failed",
        }
    }

    pub fn log_label(self) -> &'static str {
        match self {
            Endpoint::Translate => "Translation error",
            Endpoint::Transcribe => "Transcription error",
            Endpoint::Summarize => "Summarization error",
        }
    }
}

/// HTTP-facing error: a [`GatewayError`] tagged with the endpoint that produced it.
#[derive(Debug)]
pub struct ApiError {
    pub endpoint: Endpoint,
    pub source: GatewayError,
}

impl ApiError {
    /// Log the failure under the endpoint label and wrap it for the response.
    pub fn logged(endpoint: Endpoint, source: GatewayError) -> Self {
        match &source {
            GatewayError::Validation(msg) => {
                tracing::warn!("{} rejected: {}", endpoint.log_label(), msg);
            }
            other => {
                tracing::error!(kind = other.kind(), "{}: {}", endpoint.log_label(), other);
            }
        }
        Self { endpoint, source }
    }

    pub fn status(&self) -> StatusCode {
        match self.source {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.source {
            GatewayError::Validation(msg) => json!({ "error": msg }),
            other => json!({
                "error": self.endpoint.failure_message(),
                "details": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
