use std::sync::Arc;

use crate::adapter::OracleAdapter;
use crate::backends::{AnthropicAdapter, GeminiAdapter, OllamaAdapter, OpenAiAdapter};
use crate::error::OracleError;
use crate::provider::{ProviderConfig, ProviderKind};

/// Build the adapter for a provider config.
///
/// # Errors
/// [`OracleError::Config`] when a hosted backend has no API key, the model
/// name is blank, or the HTTP client cannot be built.
pub fn build_adapter(cfg: ProviderConfig) -> Result<Arc<dyn OracleAdapter>, OracleError> {
    if cfg.model.trim().is_empty() {
        return Err(OracleError::Config(format!(
            "empty model name for signature '{}'",
            cfg.signature
        )));
    }

    let adapter: Arc<dyn OracleAdapter> = match cfg.kind {
        ProviderKind::OpenAi
        | ProviderKind::DeepSeek
        | ProviderKind::Groq
        | ProviderKind::OpenRouter => Arc::new(OpenAiAdapter::new(cfg)?),
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(cfg)?),
        ProviderKind::Gemini => Arc::new(GeminiAdapter::new(cfg)?),
        ProviderKind::Ollama => Arc::new(OllamaAdapter::new(cfg)?),
    };
    Ok(adapter)
}
