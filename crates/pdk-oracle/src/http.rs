//! Shared request plumbing for the HTTP backends.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::OracleError;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, OracleError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OracleError::Config(format!("http client build failed: {e}")))
}

/// Send a request and decode a 2xx JSON body into `T`.
///
/// Non-2xx responses become [`OracleError::Http`] carrying the provider's
/// error message when one can be found in the body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<T, OracleError> {
    let resp = req.send().await.map_err(|e| map_reqwest(e, timeout))?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| map_reqwest(e, timeout))?;

    if !status.is_success() {
        return Err(OracleError::Http {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| OracleError::Api(format!("response json decode failed: {e}")))
}

fn map_reqwest(e: reqwest::Error, timeout: Duration) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout { after: timeout }
    } else {
        OracleError::Transport(e.to_string())
    }
}

/// Best-effort extraction of a provider error message.
///
/// Handles `{"error":{"message":..}}` (OpenAI, Anthropic, Gemini),
/// `{"error":".."}` (Ollama) and falls back to a truncated body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        if let Some(m) = v.pointer("/error/message").and_then(Value::as_str) {
            return m.to_string();
        }
        if let Some(m) = v.get("error").and_then(Value::as_str) {
            return m.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    trimmed.chars().take(200).collect()
}
