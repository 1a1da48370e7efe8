mod anthropic;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

use crate::error::OracleError;
use crate::provider::ProviderConfig;

/// Hosted backends refuse to build without a key.
pub(crate) fn require_api_key(cfg: &ProviderConfig) -> Result<String, OracleError> {
    match cfg.api_key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ => Err(OracleError::Config(format!(
            "missing API key for signature '{}' (provider {})",
            cfg.signature, cfg.kind
        ))),
    }
}
