use pdk_schemas::{parse_decision_with_strategy, AgentInput, TradingDecision};

use crate::error::OracleError;
use crate::provider::ProviderKind;

/// One decision-generation backend.
///
/// Implementations only need [`OracleAdapter::complete`]; the decision
/// contract (serialize input, call, tolerant parse) is shared.
#[async_trait::async_trait]
pub trait OracleAdapter: Send + Sync {
    /// Unique key of the strategy this adapter serves.
    fn signature(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Raw text completion for a system + user prompt pair.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError>;

    /// Cheap liveness probe. Errors count as unavailable.
    async fn is_available(&self) -> bool {
        self.list_models().await.is_ok()
    }

    async fn list_models(&self) -> Result<Vec<String>, OracleError>;

    /// System prompt + JSON input in, parsed [`TradingDecision`] out.
    async fn generate_decision(
        &self,
        system_prompt: &str,
        input: &AgentInput,
    ) -> Result<TradingDecision, OracleError> {
        let user_prompt = serde_json::to_string_pretty(input)
            .map_err(|e| OracleError::Config(format!("agent input serialize failed: {e}")))?;
        let raw = self.complete(system_prompt, &user_prompt).await?;

        match parse_decision_with_strategy(&raw) {
            Ok((decision, strategy)) => {
                tracing::debug!(
                    signature = self.signature(),
                    strategy = strategy.as_str(),
                    orders = decision.orders.len(),
                    "decision parsed"
                );
                Ok(decision)
            }
            Err(e) => {
                tracing::warn!(
                    signature = self.signature(),
                    error = %e,
                    raw_len = raw.len(),
                    "oracle output unparseable"
                );
                Err(OracleError::Unparseable(e))
            }
        }
    }
}
