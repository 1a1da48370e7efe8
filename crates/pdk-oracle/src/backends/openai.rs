//! OpenAI Chat Completions, and every backend that speaks its dialect
//! (DeepSeek, Groq, OpenRouter, self-hosted gateways).

use serde::{Deserialize, Serialize};

use crate::adapter::OracleAdapter;
use crate::backends::require_api_key;
use crate::error::OracleError;
use crate::http::{build_client, send_json};
use crate::provider::{ProviderConfig, ProviderKind};

// No Debug: holds the resolved API key.
#[derive(Clone)]
pub struct OpenAiAdapter {
    cfg: ProviderConfig,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(cfg: ProviderConfig) -> Result<Self, OracleError> {
        let api_key = require_api_key(&cfg)?;
        let http = build_client(cfg.timeout)?;
        Ok(Self { cfg, api_key, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url(), path)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
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
impl OracleAdapter for OpenAiAdapter {
    fn signature(&self) -> &str {
        &self.cfg.signature
    }

    fn kind(&self) -> ProviderKind {
        self.cfg.kind
    }

    fn model(&self) -> &str {
        &self.cfg.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        let req = self
            .http
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body);
        let resp: ChatResponse = send_json(req, self.cfg.timeout).await?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::Api("chat completion returned no content".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let req = self.http.get(self.url("models")).bearer_auth(&self.api_key);
        let resp: ModelList = send_json(req, self.cfg.timeout).await?;
        Ok(resp.data.into_iter().map(|m| m.id).collect())
    }
}
