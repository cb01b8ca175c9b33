//! Opaque forwarding to upstream endpoints that the gateway does not interpret.
//!
//! The upstream status, content type and body are handed back unchanged.

use axum::{
    body::Body,
    extract::Multipart,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{GeminiConfig, TRANSCRIPTION_MODEL};
use crate::error::ApiResult;
use crate::llm::UpstreamError;

/// Prompt sent by the experimental generative-content route.
pub const GEMINI_PROMPT: &str = "Explain how AI works in a few words";

/// Re-emit every field of the client's form, add the transcription model,
/// and post it to `url` with the bearer key.
pub async fn forward_transcription(
    http: &Client,
    url: &str,
    api_key: &str,
    multipart: Multipart,
) -> ApiResult<Response> {
    let form = rebuild_form(multipart).await?;
    debug!("Forwarding transcription to {}", url);

    let upstream = http
        .post(url)
        .bearer_auth(api_key)
        .multipart(form)
        .send()
        .await
        .map_err(UpstreamError::from)?;

    Ok(passthrough_response(upstream))
}

async fn rebuild_form(mut multipart: Multipart) -> ApiResult<Form> {
    let mut form = Form::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let mut part = match content_type {
            Some(content_type) => Part::bytes(data.to_vec())
                .mime_str(&content_type)
                .unwrap_or_else(|_| {
                    warn!("Dropping unparsable content type {:?} on field {}", content_type, name);
                    Part::bytes(data.to_vec())
                }),
            None => Part::bytes(data.to_vec()),
        };
        if let Some(file_name) = file_name {
            part = part.file_name(file_name);
        }
        form = form.part(name, part);
    }
    Ok(form.text("model", TRANSCRIPTION_MODEL))
}

/// Send the fixed prompt to the generative-content provider.
pub async fn forward_gemini(http: &Client, gemini: &GeminiConfig) -> ApiResult<Response> {
    let url = format!("{}/models/{}:generateContent", gemini.base_url, gemini.model);
    debug!("Forwarding generative-content prompt to {}", url);

    let body = json!({
        "contents": [{
            "parts": [{ "text": GEMINI_PROMPT }]
        }]
    });
    let upstream = http
        .post(&url)
        .header("x-goog-api-key", &gemini.api_key)
        .json(&body)
        .send()
        .await
        .map_err(UpstreamError::from)?;

    Ok(passthrough_response(upstream))
}

/// Stream an upstream response back to the client with its status and
/// content type intact.
fn passthrough_response(upstream: reqwest::Response) -> Response {
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok());

    let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn passthrough_keeps_status_and_body() {
        let upstream = axum::http::Response::builder()
            .status(429)
            .header("content-type", "application/json")
            .body(r#"{"message":"rate limited"}"#)
            .unwrap();
        let response = passthrough_response(reqwest::Response::from(upstream));

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"message":"rate limited"}"#);
    }
}
