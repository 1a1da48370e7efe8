//! Google Gemini `generateContent`.

use serde::{Deserialize, Serialize};

use crate::adapter::OracleAdapter;
use crate::backends::require_api_key;
use crate::error::OracleError;
use crate::http::{build_client, send_json};
use crate::provider::{ProviderConfig, ProviderKind};

// No Debug: holds the resolved API key.
#[derive(Clone)]
pub struct GeminiAdapter {
    cfg: ProviderConfig,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(cfg: ProviderConfig) -> Result<Self, OracleError> {
        let api_key = require_api_key(&cfg)?;
        let http = build_client(cfg.timeout)?;
        Ok(Self { cfg, api_key, http })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

#[async_trait::async_trait]
impl OracleAdapter for GeminiAdapter {
    fn signature(&self) -> &str {
        &self.cfg.signature
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        &self.cfg.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.cfg.temperature,
                max_output_tokens: self.cfg.max_tokens,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.cfg.base_url(),
            self.cfg.model
        );
        let req = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let resp: GenerateResponse = send_json(req, self.cfg.timeout).await?;

        let text: String = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OracleError::Api("generateContent returned no text".to_string()));
        }
        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let req = self
            .http
            .get(format!("{}/v1beta/models", self.cfg.base_url()))
            .header("x-goog-api-key", &self.api_key);
        let resp: ModelList = send_json(req, self.cfg.timeout).await?;
        Ok(resp
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}
