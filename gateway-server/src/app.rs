use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use gateway_shared::{ChatRequest, ResponseEnvelope};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::catalog::{self, ModelEntry};
use crate::config::{Config, GeminiConfig};
use crate::error::ApiResult;
use crate::llm::{ChatUpstream, LlmService};
use crate::passthrough;
use crate::relay;

/// Immutable per-process state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn ChatUpstream>,
    pub http: reqwest::Client,
    pub api_key: Arc<str>,
    pub transcription_url: Arc<str>,
    pub default_model: Arc<str>,
    pub chat_body_limit: usize,
    pub upload_body_limit: usize,
    pub gemini: Option<Arc<GeminiConfig>>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        let llm = LlmService::new(http.clone(), config.api_key.clone(), &config.api_base);
        Ok(Self {
            llm: Arc::new(llm),
            http,
            api_key: config.api_key.as_str().into(),
            transcription_url: format!("{}/audio/transcriptions", config.api_base).into(),
            default_model: config.default_model.as_str().into(),
            chat_body_limit: config.chat_body_limit,
            upload_body_limit: config.upload_body_limit,
            gemini: config.gemini.clone().map(Arc::new),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(echo))
        .route("/model/list", get(list_models))
        .route(
            "/chat",
            post(chat).layer(DefaultBodyLimit::max(state.chat_body_limit)),
        )
        .route(
            "/transcriptions",
            post(transcriptions).layer(DefaultBodyLimit::max(state.upload_body_limit)),
        );

    if state.gemini.is_some() {
        info!("Generative-content route enabled at /gemini");
        app = app.route("/gemini", get(gemini));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    debug!("Request headers: {:?}", headers);

    Json(json!({
        "method": method.as_str(),
        "uri": uri.to_string(),
        "headers": headers,
    }))
}

async fn list_models() -> Json<ResponseEnvelope<&'static [ModelEntry]>> {
    Json(ResponseEnvelope::success(catalog::models()))
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let request = ChatRequest::from_slice(&body?, &state.default_model)?;
    info!(
        model = %request.model,
        stream = request.stream,
        messages = request.messages.len(),
        "Processing chat request"
    );

    if request.stream {
        let chunks = state.llm.stream_chat(&request).await?;
        Ok(relay::event_stream_response(chunks))
    } else {
        let completion = state.llm.complete_chat(&request).await?;
        Ok(Json(ResponseEnvelope::success(completion)).into_response())
    }
}

async fn transcriptions(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Response> {
    passthrough::forward_transcription(
        &state.http,
        &state.transcription_url,
        &state.api_key,
        multipart,
    )
    .await
}

async fn gemini(State(state): State<AppState>) -> ApiResult<Response> {
    match &state.gemini {
        Some(gemini) => passthrough::forward_gemini(&state.http, gemini).await,
        None => Ok(axum::http::StatusCode::NOT_FOUND.into_response()),
    }
}
