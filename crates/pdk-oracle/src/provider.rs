use std::time::Duration;

use crate::error::OracleError;

/// Closed set of supported backends.
///
/// `DeepSeek`, `Groq` and `OpenRouter` speak the OpenAI Chat Completions
/// dialect and share its adapter with a different default base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Groq,
    OpenRouter,
    Anthropic,
    Gemini,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 7] = [
        ProviderKind::OpenAi,
        ProviderKind::DeepSeek,
        ProviderKind::Groq,
        ProviderKind::OpenRouter,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn parse(s: &str) -> Result<Self, OracleError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "groq" => Ok(ProviderKind::Groq),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(OracleError::Config(format!(
                "unknown provider '{other}'. expected one of: openai | deepseek | groq | openrouter | anthropic | gemini | ollama"
            ))),
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    /// Local Ollama runs without a key; every hosted backend needs one.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            ProviderKind::OpenAi
                | ProviderKind::DeepSeek
                | ProviderKind::Groq
                | ProviderKind::OpenRouter
        )
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to build one adapter.
///
/// **`api_key` is redacted in `Debug` output.**
#[derive(Clone)]
pub struct ProviderConfig {
    /// Unique key of the strategy this adapter serves.
    pub signature: String,
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    /// Overrides [`ProviderKind::default_base_url`].
    pub base_url: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn new(signature: impl Into<String>, kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            kind,
            model: model.into(),
            api_key: None,
            base_url: None,
            timeout: Duration::from_secs(30),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("signature", &self.signature)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_closed() {
        assert_eq!(ProviderKind::parse("OpenAI").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::parse(" claude ").unwrap(), ProviderKind::Anthropic);
        assert!(matches!(
            ProviderKind::parse("bard"),
            Err(OracleError::Config(_))
        ));
        for k in ProviderKind::ALL {
            assert_eq!(ProviderKind::parse(k.as_str()).unwrap(), k);
        }
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = ProviderConfig::new("s1", ProviderKind::OpenAi, "gpt-4o").with_api_key("sk-live-123");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-live-123"));
        assert!(dbg.contains("<REDACTED>"));
    }

    #[test]
    fn base_url_override_is_trimmed() {
        let cfg = ProviderConfig::new("s1", ProviderKind::Groq, "llama3").with_base_url("http://x/v1/");
        assert_eq!(cfg.base_url(), "http://x/v1");
        let cfg = ProviderConfig::new("s1", ProviderKind::Groq, "llama3");
        assert_eq!(cfg.base_url(), "https://api.groq.com/openai/v1");
    }
}
