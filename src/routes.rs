use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::asr::{stage_audio, upload::NO_AUDIO_FILE, TranscriptionResult};
use crate::error::{ApiError, Endpoint, GatewayError};
use crate::state::AppState;
use crate::summarize::{summarizer::parse_messages, summarizer::INVALID_MESSAGES, SummarizeRequest};
use crate::translate::{translator::MISSING_FIELDS, TranslationRequest, TranslationResult};

pub fn create_routes(state: &AppState) -> Router<AppState> {
    let max_upload_bytes = state.config.system_config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/translate", post(translate))
        .route(
            "/api/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/summarize", post(summarize))
}

/// Full application: routes plus tracing and permissive CORS.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes(&state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let provider = &state.config.provider_config;
    Json(json!({
        "status": "ok",
        "chatModel": provider.chat_model,
        "transcriptionModel": provider.transcription_model,
        "promptVersion": state.config.prompt_config.version,
    }))
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResult>, ApiError> {
    let fail = |e| ApiError::logged(Endpoint::Translate, e);

    let Json(request) = payload.map_err(|rejection| {
        debug!("Translate body rejected: {}", rejection.body_text());
        fail(GatewayError::validation(MISSING_FIELDS))
    })?;

    let result = state.translator.translate(request).await.map_err(fail)?;
    Ok(Json(result))
}

async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResult>, ApiError> {
    let fail = |e| ApiError::logged(Endpoint::Transcribe, e);

    let multipart = multipart.map_err(|rejection| {
        debug!("Transcribe body rejected: {}", rejection.body_text());
        fail(GatewayError::validation(NO_AUDIO_FILE))
    })?;

    let limit = state.config.system_config.max_upload_bytes;
    let upload = stage_audio(&state.upload_dir, limit, multipart)
        .await
        .map_err(fail)?;
    let result = state.transcriber.transcribe(upload).await.map_err(fail)?;
    Ok(Json(result))
}

async fn summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let fail = |e| ApiError::logged(Endpoint::Summarize, e);

    let Json(request) = payload.map_err(|rejection| {
        debug!("Summarize body rejected: {}", rejection.body_text());
        fail(GatewayError::validation(INVALID_MESSAGES))
    })?;

    let messages = parse_messages(request.messages).map_err(fail)?;
    let summary = state.summarizer.summarize(&messages).await.map_err(fail)?;
    Ok(Json(summary))
}
