//! Local Ollama server (`/api/chat`, `/api/tags`). No API key.

use serde::{Deserialize, Serialize};

use crate::adapter::OracleAdapter;
use crate::error::OracleError;
use crate::http::{build_client, send_json};
use crate::provider::{ProviderConfig, ProviderKind};

#[derive(Debug, Clone)]
pub struct OllamaAdapter {
    cfg: ProviderConfig,
    http: reqwest::Client,
}

impl OllamaAdapter {
    pub fn new(cfg: ProviderConfig) -> Result<Self, OracleError> {
        let http = build_client(cfg.timeout)?;
        Ok(Self { cfg, http })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[async_trait::async_trait]
impl OracleAdapter for OllamaAdapter {
    fn signature(&self) -> &str {
        &self.cfg.signature
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
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
            stream: false,
            options: ChatOptions {
                temperature: self.cfg.temperature,
                num_predict: self.cfg.max_tokens,
            },
        };

        let req = self
            .http
            .post(format!("{}/api/chat", self.cfg.base_url()))
            .json(&body);
        let resp: ChatResponse = send_json(req, self.cfg.timeout).await?;

        if let Some(err) = resp.error {
            return Err(OracleError::Api(err));
        }
        match resp.message {
            Some(m) if !m.content.trim().is_empty() => Ok(m.content),
            _ => Err(OracleError::Api("ollama chat returned no content".to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let req = self.http.get(format!("{}/api/tags", self.cfg.base_url()));
        let resp: TagList = send_json(req, self.cfg.timeout).await?;
        Ok(resp.models.into_iter().map(|m| m.name).collect())
    }
}
