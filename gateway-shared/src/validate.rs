//! Validation of inbound chat request bodies.
//!
//! Client JSON is checked field by field and every violation is collected,
//! so a rejected request reports all of its problems at once.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ChatMessage, ChatRequest, MessageRole};

const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
const MAX_TOKENS_RANGE: (u32, u32) = (1, 4000);

/// A request body that failed one or more constraints.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", .violations.join("; "))]
pub struct ValidationError {
    violations: Vec<String>,
}

impl ValidationError {
    fn single(path: &str, message: impl AsRef<str>) -> Self {
        Self {
            violations: vec![format!("{path}: {}", message.as_ref())],
        }
    }

    /// Each entry reads `path: message`.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, path: impl AsRef<str>, message: impl AsRef<str>) {
        self.0.push(format!("{}: {}", path.as_ref(), message.as_ref()));
    }
}

impl ChatRequest {
    /// Parse raw body bytes and validate them. Malformed JSON is reported
    /// as a validation failure.
    pub fn from_slice(bytes: &[u8], default_model: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ValidationError::single("body", format!("invalid JSON: {e}")))?;
        Self::from_json(&value, default_model)
    }

    /// Validate an untyped JSON body, applying `default_model` and
    /// `stream = true` when those fields are absent.
    pub fn from_json(value: &Value, default_model: &str) -> Result<Self, ValidationError> {
        let Some(body) = value.as_object() else {
            return Err(ValidationError::single("body", "expected an object"));
        };

        let mut violations = Violations::default();

        let model = match body.get("model") {
            None => Some(default_model.to_string()),
            Some(Value::String(model)) => Some(model.clone()),
            Some(_) => {
                violations.push("model", "expected a string");
                None
            }
        };
        let messages = parse_messages(body.get("messages"), &mut violations);
        let stream = match body.get("stream") {
            None => Some(true),
            Some(Value::Bool(stream)) => Some(*stream),
            Some(_) => {
                violations.push("stream", "expected a boolean");
                None
            }
        };
        let temperature = bounded_number(body, "temperature", TEMPERATURE_RANGE, &mut violations);
        let max_tokens = bounded_integer(body, "max_tokens", MAX_TOKENS_RANGE, &mut violations);
        let top_p = bounded_number(body, "top_p", TOP_P_RANGE, &mut violations);

        match (model, messages, stream) {
            (Some(model), Some(messages), Some(stream)) if violations.0.is_empty() => Ok(Self {
                model,
                messages,
                stream,
                temperature,
                max_tokens,
                top_p,
            }),
            _ => Err(ValidationError {
                violations: violations.0,
            }),
        }
    }
}

fn parse_messages(value: Option<&Value>, violations: &mut Violations) -> Option<Vec<ChatMessage>> {
    let items = match value {
        None => {
            violations.push("messages", "required");
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            violations.push("messages", "expected an array");
            return None;
        }
    };

    if items.is_empty() {
        violations.push("messages", "至少需要一条消息 (minimum length 1)");
        return None;
    }

    let mut messages = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let path = format!("messages[{index}]");
        let Some(fields) = item.as_object() else {
            violations.push(&path, "expected an object");
            continue;
        };

        let role = match fields.get("role") {
            None => {
                violations.push(format!("{path}.role"), "required");
                None
            }
            Some(Value::String(role)) => {
                let parsed = MessageRole::parse(role);
                if parsed.is_none() {
                    violations.push(
                        format!("{path}.role"),
                        format!("expected one of 'user', 'assistant', 'system', got '{role}'"),
                    );
                }
                parsed
            }
            Some(_) => {
                violations.push(
                    format!("{path}.role"),
                    "expected one of 'user', 'assistant', 'system'",
                );
                None
            }
        };

        let content = match fields.get("content") {
            None => {
                violations.push(format!("{path}.content"), "required");
                None
            }
            Some(Value::String(content)) if content.is_empty() => {
                violations.push(format!("{path}.content"), "消息内容不能为空 (minimum length 1)");
                None
            }
            Some(Value::String(content)) => Some(content.clone()),
            Some(_) => {
                violations.push(format!("{path}.content"), "expected a string");
                None
            }
        };

        if let (Some(role), Some(content)) = (role, content) {
            messages.push(ChatMessage { role, content });
        }
    }

    Some(messages)
}

fn number_field(
    body: &Map<String, Value>,
    field: &str,
    violations: &mut Violations,
) -> Option<f64> {
    match body.get(field) {
        None => None,
        Some(Value::Number(number)) => number.as_f64(),
        Some(_) => {
            violations.push(field, "expected a number");
            None
        }
    }
}

fn bounded_number(
    body: &Map<String, Value>,
    field: &str,
    (min, max): (f64, f64),
    violations: &mut Violations,
) -> Option<f32> {
    let value = number_field(body, field, violations)?;
    if value < min || value > max {
        violations.push(field, format!("must be between {min} and {max}, got {value}"));
        return None;
    }
    Some(value as f32)
}

fn bounded_integer(
    body: &Map<String, Value>,
    field: &str,
    (min, max): (u32, u32),
    violations: &mut Violations,
) -> Option<u32> {
    let value = number_field(body, field, violations)?;
    if value.fract() != 0.0 {
        violations.push(field, format!("expected an integer, got {value}"));
        return None;
    }
    if value < f64::from(min) || value > f64::from(max) {
        violations.push(field, format!("must be between {min} and {max}, got {value}"));
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MODEL;
    use serde_json::json;

    fn validate(value: Value) -> Result<ChatRequest, ValidationError> {
        ChatRequest::from_json(&value, DEFAULT_MODEL)
    }

    #[test]
    fn applies_defaults() {
        let request = validate(json!({"messages": [{"role": "user", "content": "hi"}]})).unwrap();
        assert_eq!(request.model, DEFAULT_MODEL);
        assert!(request.stream);
        assert_eq!(request.temperature, None);
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.top_p, None);
        assert_eq!(
            request.messages,
            vec![ChatMessage {
                role: MessageRole::User,
                content: "hi".to_string()
            }]
        );
    }

    #[test]
    fn keeps_explicit_fields() {
        let request = validate(json!({
            "model": "Qwen/Qwen3-8B",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ],
            "stream": false,
            "temperature": 0.7,
            "max_tokens": 512,
            "top_p": 1
        }))
        .unwrap();
        assert_eq!(request.model, "Qwen/Qwen3-8B");
        assert!(!request.stream);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.top_p, Some(1.0));
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[2].role, MessageRole::Assistant);
    }

    #[test]
    fn missing_messages_fails() {
        let err = validate(json!({"model": "x"})).unwrap_err();
        assert_eq!(err.violations(), ["messages: required"]);
    }

    #[test]
    fn empty_messages_reports_minimum_length() {
        let err = validate(json!({"messages": []})).unwrap_err();
        assert!(err.to_string().contains("minimum length 1"));
        assert!(err.to_string().contains("至少需要一条消息"));
    }

    #[test]
    fn unknown_role_fails() {
        for role in ["tool", "function", "USER", ""] {
            let err = validate(json!({"messages": [{"role": role, "content": "hi"}]})).unwrap_err();
            assert!(
                err.violations()[0].starts_with("messages[0].role:"),
                "role {role:?} gave {err}"
            );
        }
    }

    #[test]
    fn empty_content_fails() {
        let err = validate(json!({"messages": [{"role": "user", "content": ""}]})).unwrap_err();
        assert_eq!(
            err.violations(),
            ["messages[0].content: 消息内容不能为空 (minimum length 1)"]
        );
    }

    #[test]
    fn reports_every_violation() {
        let err = validate(json!({
            "messages": [{"role": "robot", "content": 3}],
            "stream": "yes",
            "temperature": 2.5,
            "max_tokens": 0,
            "top_p": -0.1
        }))
        .unwrap_err();
        let paths: Vec<&str> = err
            .violations()
            .iter()
            .map(|v| v.split(':').next().unwrap())
            .collect();
        assert_eq!(
            paths,
            [
                "messages[0].role",
                "messages[0].content",
                "stream",
                "temperature",
                "max_tokens",
                "top_p"
            ]
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let request = validate(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 2,
            "max_tokens": 4000,
            "top_p": 0
        }))
        .unwrap();
        assert_eq!(request.temperature, Some(2.0));
        assert_eq!(request.max_tokens, Some(4000));
        assert_eq!(request.top_p, Some(0.0));

        assert!(validate(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 4001
        }))
        .is_err());
    }

    #[test]
    fn max_tokens_must_be_integral() {
        let err = validate(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 10.5
        }))
        .unwrap_err();
        assert!(err.violations()[0].starts_with("max_tokens: expected an integer"));
    }

    #[test]
    fn null_is_not_absence() {
        let err = validate(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "model": null,
            "temperature": null
        }))
        .unwrap_err();
        assert_eq!(
            err.violations(),
            ["model: expected a string", "temperature: expected a number"]
        );
    }

    #[test]
    fn non_object_body_fails() {
        let err = validate(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.violations(), ["body: expected an object"]);
    }

    #[test]
    fn malformed_json_fails() {
        let err = ChatRequest::from_slice(b"{\"messages\": [", DEFAULT_MODEL).unwrap_err();
        assert!(err.violations()[0].starts_with("body: invalid JSON"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let request = validate(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "user": "abc"
        }))
        .unwrap();
        assert_eq!(request.messages.len(), 1);
    }
}
