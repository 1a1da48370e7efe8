//! pdk-agent
//!
//! The per-strategy day loop and the simulation driver around it.
//! - [`TradingAgent`]: input -> oracle -> screen/validate/execute -> summary
//! - [`RagTradingAgent`]: same contract, input enriched from a retrieval store
//! - [`Simulation`]: N strategies over a date range, concurrent per day
//!
//! Side effects that must never fail a trading day (audit writes, retrieval
//! store calls) go through [`best_effort`].

mod agent;
mod phase;
mod prompt;
mod rag;
mod sim;

#[cfg(test)]
mod testing;

pub use agent::{
    AgentError, AgentSettings, TradingAgent, GENERATION_FAILED_SUMMARY, INPUT_ERROR_SUMMARY,
};
pub use phase::AgentPhase;
pub use prompt::SYSTEM_PROMPT;
pub use rag::{cosine, embed, InMemoryRetrievalStore, RagSettings, RagTradingAgent, RetrievalStore};
pub use sim::{
    agent_settings, build_manager, provider_configs, DayResult, SimAgent, Simulation, SimulationReport,
};

use std::fmt::Display;

/// Log a failed side effect and carry on. Returns the value on success.
pub fn best_effort<T, E: Display>(what: &str, strategy: &str, res: Result<T, E>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(strategy, what, error = %e, "best-effort step failed");
            None
        }
    }
}
