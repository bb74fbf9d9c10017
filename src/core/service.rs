//! Shared plumbing for the hosted functions (chat, analysis, translation).

use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use crate::api::ErrorBody;
use crate::utils::url::construct_api_url;

pub const CHAT_FUNCTION: &str = "chat-with-ai";
pub const ANALYZE_FUNCTION: &str = "analyze-image";
pub const TRANSLATE_FUNCTION: &str = "translate";

/// Where the hosted functions live and how to authenticate against them.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub endpoint: String,
    pub api_key: String,
}

impl ServiceSettings {
    pub fn function_url(&self, function: &str) -> String {
        construct_api_url(&self.endpoint, function)
    }

    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
    }
}

#[derive(Debug)]
pub enum ServiceError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    Transport(reqwest::Error),
    /// The function answered with a non-success status.
    Status { status: StatusCode, message: String },
    /// The function answered 2xx but reported an error in its body.
    Api(String),
    /// The response body was not the JSON we expected.
    Decode(serde_json::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Transport(err) => write!(f, "Request failed: {err}"),
            ServiceError::Status { status, message } => {
                write!(f, "{message} (HTTP {})", status.as_u16())
            }
            ServiceError::Api(message) => write!(f, "{message}"),
            ServiceError::Decode(err) => write!(f, "Unexpected response: {err}"),
        }
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ServiceError::Transport(err) => Some(err),
            ServiceError::Decode(err) => Some(err),
            ServiceError::Status { .. } | ServiceError::Api(_) => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err)
    }
}

/// Pull a human-readable message out of an error value, which may be a bare
/// string, an object with `message`, or a body wrapping either under `error`.
pub fn error_summary(value: &Value) -> Option<String> {
    let summary = match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| map.get("error").and_then(error_summary)),
        _ => None,
    };

    summary
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Message to show for a failed response body, falling back to `fallback`
/// when the body carries nothing usable.
pub fn message_from_error_body(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error_summary(&error))
        .unwrap_or_else(|| fallback.to_string())
}

/// Turn a non-success response into a [`ServiceError::Status`].
pub async fn status_error(response: reqwest::Response, fallback: &str) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ServiceError::Status {
        status,
        message: message_from_error_body(&body, fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_handles_strings_objects_and_wrappers() {
        assert_eq!(
            error_summary(&json!("Rate limit exceeded.")).as_deref(),
            Some("Rate limit exceeded.")
        );
        assert_eq!(
            error_summary(&json!({"message": "model   overloaded\n"})).as_deref(),
            Some("model overloaded")
        );
        assert_eq!(
            error_summary(&json!({"error": {"message": "nested"}})).as_deref(),
            Some("nested")
        );
        assert_eq!(error_summary(&json!({"code": 500})), None);
        assert_eq!(error_summary(&json!("   ")), None);
    }

    #[test]
    fn error_body_falls_back_when_unusable() {
        assert_eq!(
            message_from_error_body(r#"{"error":"AI service unavailable"}"#, "Failed"),
            "AI service unavailable"
        );
        assert_eq!(message_from_error_body("<html>502</html>", "Failed"), "Failed");
        assert_eq!(message_from_error_body("{}", "Failed"), "Failed");
    }

    #[test]
    fn function_urls_join_cleanly() {
        let settings = ServiceSettings {
            endpoint: "https://demo.functions.example/v1/".into(),
            api_key: "key".into(),
        };
        assert_eq!(
            settings.function_url(CHAT_FUNCTION),
            "https://demo.functions.example/v1/chat-with-ai"
        );
    }

    #[test]
    fn status_errors_mention_the_code() {
        let err = ServiceError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Rate limit exceeded. Please try again later.".into(),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please try again later. (HTTP 429)"
        );
    }
}
