//! HTTP client for the chat backend
//!
//! One call per turn: POST `{"message": ...}` and read back a JSON object
//! that should carry a `response` field.

use std::time::Duration;

use reqwest::{header, Client};
use serde::Serialize;
use serde_json::{Map, Value};
use snafu::{ensure, ResultExt, Snafu};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5001/chat";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Body returned by the backend, kept as-is
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub response: Option<String>,
    /// Any other fields the backend sends along
    pub extra: Map<String, Value>,
}

impl From<Value> for ChatResponse {
    /// Any well-formed JSON is accepted; only a string `response` counts as text.
    fn from(value: Value) -> Self {
        let Value::Object(mut extra) = value else {
            return Self {
                response: None,
                extra: Map::new(),
            };
        };

        let response = match extra.remove("response") {
            Some(Value::String(text)) => Some(text),
            Some(Value::Null) | None => None,
            Some(other) => {
                extra.insert("response".to_string(), other);
                None
            }
        };
        Self { response, extra }
    }
}

impl ChatResponse {
    /// Extract the assistant text, treating a missing or empty `response`
    /// as a failed exchange.
    pub fn into_text(self) -> Result<String, TransportError> {
        match self.response {
            Some(text) if !text.is_empty() => Ok(text),
            _ => EmptyResponseSnafu.fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Network,
    Server,
    Decode,
    EmptyResponse,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("Network error: {source}"))]
    Network { source: reqwest::Error },

    #[snafu(display("Server error: {status}"))]
    Server { status: u16 },

    #[snafu(display("Malformed response: {source}"))]
    Decode { source: serde_json::Error },

    #[snafu(display("No response received from server"))]
    EmptyResponse,
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Network { .. } => TransportErrorKind::Network,
            TransportError::Server { .. } => TransportErrorKind::Server,
            TransportError::Decode { .. } => TransportErrorKind::Decode,
            TransportError::EmptyResponse => TransportErrorKind::EmptyResponse,
        }
    }
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Client that gives up on a request after `timeout`
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn send(&self, message: &str) -> Result<ChatResponse, TransportError> {
        debug!(endpoint = %self.endpoint, outgoing = message, "sending chat message");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .json(&ChatRequest { message })
            .send()
            .await
            .context(NetworkSnafu)?;

        let status = response.status();
        ensure!(
            status.is_success(),
            ServerSnafu {
                status: status.as_u16()
            }
        );

        let body = response.bytes().await.context(NetworkSnafu)?;
        debug!(body = %String::from_utf8_lossy(&body), "received chat response");

        let value: Value = serde_json::from_slice(&body).context(DecodeSnafu)?;
        Ok(ChatResponse::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> ChatResponse {
        ChatResponse::from(serde_json::from_str::<Value>(body).unwrap())
    }

    #[test]
    fn test_into_text_returns_response() {
        let reply = decode(r#"{"response": "Hi there!", "session_id": "abc"}"#);
        assert_eq!(reply.extra.get("session_id").and_then(|v| v.as_str()), Some("abc"));
        assert!(!reply.extra.contains_key("response"));
        assert_eq!(reply.into_text().unwrap(), "Hi there!");
    }

    #[test]
    fn test_missing_response_is_empty_response() {
        let err = decode(r#"{"foo": "bar"}"#).into_text().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::EmptyResponse);
        assert_eq!(err.to_string(), "No response received from server");
    }

    #[test]
    fn test_null_or_blank_response_is_empty_response() {
        for body in [r#"{"response": null}"#, r#"{"response": ""}"#] {
            assert_eq!(
                decode(body).into_text().unwrap_err().kind(),
                TransportErrorKind::EmptyResponse
            );
        }
    }

    #[test]
    fn test_non_object_body_is_empty_response() {
        for body in ["null", "[]", r#""hi""#, "42"] {
            let reply = decode(body);
            assert!(reply.extra.is_empty());
            assert_eq!(
                reply.into_text().unwrap_err().kind(),
                TransportErrorKind::EmptyResponse
            );
        }
    }

    #[test]
    fn test_non_string_response_is_kept_in_extra() {
        let reply = decode(r#"{"response": {"text": "hi"}}"#);
        assert_eq!(reply.response, None);
        assert_eq!(reply.extra.get("response"), Some(&serde_json::json!({ "text": "hi" })));
        assert_eq!(reply.into_text().unwrap_err().kind(), TransportErrorKind::EmptyResponse);
    }

    #[test]
    fn test_server_error_display_includes_status() {
        let err = TransportError::Server { status: 500 };
        assert_eq!(err.to_string(), "Server error: 500");
        assert_eq!(err.kind(), TransportErrorKind::Server);
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_string(&ChatRequest { message: "hello" }).unwrap();
        assert_eq!(body, r#"{"message":"hello"}"#);
    }
}
