//! pdk-oracle
//!
//! Decision oracles: the LLM backends a strategy asks for its daily
//! TradingDecision.
//!
//! - [`OracleAdapter`]: one implementation per backend family
//! - [`build_adapter`]: factory keyed by the closed [`ProviderKind`] enum
//! - [`MultiProviderManager`]: concurrent fan-out with per-adapter failure
//!   isolation and an overall call cap
//!
//! API keys are passed in by the caller (resolved from env var names by
//! pdk-config); they are never logged and never appear in `Debug` output.

mod adapter;
mod backends;
mod error;
mod factory;
mod http;
mod manager;
mod provider;

pub use adapter::OracleAdapter;
pub use backends::{AnthropicAdapter, GeminiAdapter, OllamaAdapter, OpenAiAdapter};
pub use error::OracleError;
pub use factory::build_adapter;
pub use manager::{MultiProviderManager, DEFAULT_CALL_CAP};
pub use provider::{ProviderConfig, ProviderKind};
