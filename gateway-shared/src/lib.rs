use serde::{Deserialize, Serialize};

mod validate;

pub use validate::ValidationError;

/// Model used when a chat request does not name one.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A chat request that has passed validation.
///
/// Only [`ChatRequest::from_json`] and [`ChatRequest::from_slice`] build one
/// from client input, so every instance satisfies the field constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// Uniform wrapper around successful non-streaming responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub code: u16,
    pub data: T,
    pub message: String,
    pub redirect_url: String,
    pub toast: u8,
    #[serde(rename = "type")]
    pub kind: String,
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            data,
            message: "success".to_string(),
            redirect_url: String::new(),
            toast: 0,
            kind: "success".to_string(),
        }
    }
}

/// Body of every error response produced by the gateway itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
