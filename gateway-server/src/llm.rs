use std::fmt;

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::{future, stream::BoxStream, Stream, StreamExt, TryStreamExt};
use gateway_shared::{ChatMessage, ChatRequest, MessageRole};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Sentinel the upstream sends after its last chunk.
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental completion chunks, in upstream emission order.
pub type ChunkStream = BoxStream<'static, Result<Value, UpstreamError>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build upstream request: {0}")]
    Request(#[from] OpenAIError),

    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream event stream failed: {0}")]
    Stream(String),
}

/// A provider able to run chat completions.
#[async_trait]
pub trait ChatUpstream: Send + Sync {
    /// Run a non-streaming completion and return the provider's response object.
    async fn complete_chat(&self, request: &ChatRequest) -> Result<Value, UpstreamError>;

    /// Start a streaming completion. Chunks are read from the provider only as
    /// the returned stream is polled.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, UpstreamError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmService {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl LlmService {
    pub fn new(http: reqwest::Client, api_key: String, api_base: &str) -> Self {
        info!("Initializing LLM service against {}", api_base);
        Self {
            http,
            api_key,
            endpoint: format!("{api_base}/chat/completions"),
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, UpstreamError> {
        let body = build_request(request)?;
        debug!(
            endpoint = %self.endpoint,
            model = %body.model,
            stream = request.stream,
            messages = body.messages.len(),
            "Calling upstream chat completion"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Failed to read upstream error body: {}", e);
                    format!("<unreadable body: {e}>")
                }
            };
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatUpstream for LlmService {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<Value, UpstreamError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, UpstreamError> {
        let response = self.send(request).await?;
        Ok(decode_event_stream(response.bytes_stream()))
    }
}

fn build_request(request: &ChatRequest) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let messages = request
        .messages
        .iter()
        .map(convert_to_openai_message)
        .collect::<Result<Vec<_>, _>>()?;

    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(&request.model)
        .messages(messages)
        .stream(request.stream);
    if let Some(temperature) = request.temperature {
        args.temperature(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        args.max_tokens(max_tokens);
    }
    if let Some(top_p) = request.top_p {
        args.top_p(top_p);
    }
    args.build()
}

fn convert_to_openai_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = msg.content.clone();
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()?,
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()?,
        ),
        MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()?,
        ),
    };
    Ok(message)
}

/// Turn an upstream `text/event-stream` body into JSON chunks.
///
/// Ends at the `[DONE]` sentinel or when the body ends, whichever comes first.
fn decode_event_stream<S, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    body.eventsource()
        .map_err(|e| UpstreamError::Stream(e.to_string()))
        .try_filter(|event| future::ready(!event.data.is_empty()))
        .take_while(|event| {
            future::ready(!matches!(event, Ok(event) if event.data == DONE_SENTINEL))
        })
        .and_then(|event| {
            future::ready(serde_json::from_str::<Value>(&event.data).map_err(UpstreamError::from))
        })
        .boxed()
}
