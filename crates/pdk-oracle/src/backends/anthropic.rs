//! Anthropic Messages API.

use serde::{Deserialize, Serialize};

use crate::adapter::OracleAdapter;
use crate::backends::require_api_key;
use crate::error::OracleError;
use crate::http::{build_client, send_json};
use crate::provider::{ProviderConfig, ProviderKind};

const API_VERSION: &str = "2023-06-01";

// No Debug: holds the resolved API key.
#[derive(Clone)]
pub struct AnthropicAdapter {
    cfg: ProviderConfig,
    api_key: String,
    http: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(cfg: ProviderConfig) -> Result<Self, OracleError> {
        let api_key = require_api_key(&cfg)?;
        let http = build_client(cfg.timeout)?;
        Ok(Self { cfg, api_key, http })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/v1/{}", self.cfg.base_url(), path))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<UserMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[async_trait::async_trait]
impl OracleAdapter for AnthropicAdapter {
    fn signature(&self) -> &str {
        &self.cfg.signature
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.cfg.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let body = MessagesRequest {
            model: &self.cfg.model,
            max_tokens: self.cfg.max_tokens,
            system: system_prompt,
            messages: vec![UserMessage {
                role: "user",
                content: user_prompt,
            }],
            temperature: self.cfg.temperature,
        };

        let req = self.request(reqwest::Method::POST, "messages").json(&body);
        let resp: MessagesResponse = send_json(req, self.cfg.timeout).await?;

        // Text blocks concatenated in order; tool/thinking blocks ignored.
        let text: String = resp
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(OracleError::Api("messages response had no text".to_string()));
        }
        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let req = self.request(reqwest::Method::GET, "models");
        let resp: ModelList = send_json(req, self.cfg.timeout).await?;
        Ok(resp.data.into_iter().map(|m| m.id).collect())
    }
}
