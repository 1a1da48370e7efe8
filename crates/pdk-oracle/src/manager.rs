use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use pdk_schemas::{AgentInput, TradingDecision};

use crate::adapter::OracleAdapter;
use crate::error::OracleError;

/// Overall cap on a single oracle call made through the manager.
pub const DEFAULT_CALL_CAP: Duration = Duration::from_secs(30);

/// One adapter per enabled strategy, keyed by unique signature.
///
/// Fan-out calls run concurrently; one adapter's failure or timeout never
/// blocks or fails the others.
pub struct MultiProviderManager {
    adapters: BTreeMap<String, Arc<dyn OracleAdapter>>,
    call_cap: Duration,
}

impl Default for MultiProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiProviderManager {
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
            call_cap: DEFAULT_CALL_CAP,
        }
    }

    pub fn with_call_cap(mut self, cap: Duration) -> Self {
        self.call_cap = cap;
        self
    }

    /// Register an adapter under its signature.
    ///
    /// # Errors
    /// [`OracleError::Config`] if the signature is already registered.
    pub fn register(&mut self, adapter: Arc<dyn OracleAdapter>) -> Result<(), OracleError> {
        let sig = adapter.signature().to_string();
        if self.adapters.contains_key(&sig) {
            return Err(OracleError::Config(format!(
                "duplicate strategy signature '{sig}'"
            )));
        }
        tracing::info!(
            signature = %sig,
            provider = adapter.kind().as_str(),
            model = adapter.model(),
            "oracle registered"
        );
        self.adapters.insert(sig, adapter);
        Ok(())
    }

    pub fn get(&self, signature: &str) -> Option<Arc<dyn OracleAdapter>> {
        self.adapters.get(signature).cloned()
    }

    pub fn signatures(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Probe every adapter concurrently. Errors and timeouts map to `false`.
    pub async fn check_availability(&self) -> BTreeMap<String, bool> {
        let cap = self.call_cap;
        let probes = self.adapters.iter().map(|(sig, a)| async move {
            let ok = matches!(tokio::time::timeout(cap, a.is_available()).await, Ok(true));
            if !ok {
                tracing::warn!(signature = %sig, "oracle unavailable");
            }
            (sig.clone(), ok)
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Ask every adapter for its model list concurrently.
    pub async fn list_all_models(&self) -> BTreeMap<String, Result<Vec<String>, OracleError>> {
        let cap = self.call_cap;
        let calls = self.adapters.iter().map(|(sig, a)| async move {
            let res = match tokio::time::timeout(cap, a.list_models()).await {
                Ok(r) => r,
                Err(_) => Err(OracleError::Timeout { after: cap }),
            };
            (sig.clone(), res)
        });
        join_all(calls).await.into_iter().collect()
    }

    /// Generate one decision per adapter concurrently.
    pub async fn generate_all_decisions(
        &self,
        system_prompt: &str,
        input: &AgentInput,
    ) -> BTreeMap<String, Result<TradingDecision, OracleError>> {
        let cap = self.call_cap;
        let calls = self.adapters.iter().map(|(sig, a)| async move {
            let call = a.generate_decision(system_prompt, input);
            let res = match tokio::time::timeout(cap, call).await {
                Ok(r) => r,
                Err(_) => Err(OracleError::Timeout { after: cap }),
            };
            if let Err(e) = &res {
                tracing::warn!(
                    signature = %sig,
                    kind = e.kind(),
                    error = %e,
                    "decision generation failed"
                );
            }
            (sig.clone(), res)
        });
        join_all(calls).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;

    struct Fixed {
        sig: &'static str,
        reply: Result<&'static str, ()>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl OracleAdapter for Fixed {
        fn signature(&self) -> &str {
            self.sig
        }
        fn kind(&self) -> ProviderKind {
            ProviderKind::Ollama
        }
        fn model(&self) -> &str {
            "fixed"
        }
        async fn complete(&self, _: &str, _: &str) -> Result<String, OracleError> {
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Ok(s) => Ok(s.to_string()),
                Err(()) => Err(OracleError::Transport("connection refused".to_string())),
            }
        }
        async fn list_models(&self) -> Result<Vec<String>, OracleError> {
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Ok(_) => Ok(vec!["fixed".to_string()]),
                Err(()) => Err(OracleError::Transport("connection refused".to_string())),
            }
        }
    }

    const OK_BODY: &str =
        r#"{"timestamp":"2024-03-01","orders":[],"portfolioUpdates":null,"diagnostics":{"summary":"hold"}}"#;

    fn input() -> AgentInput {
        serde_json::from_value(serde_json::json!({
            "mode": "backtest",
            "timestamp": "2024-03-01",
            "tickers": [],
            "marketData": {},
            "account": {"cash": 0.0, "positions": {}, "portfolioValue": 0.0,
                        "buyingPower": 0.0, "totalPnl": 0.0},
            "marketRules": {},
            "riskConfig": {"maxPositionPct": 0.2, "maxTotalExposurePct": 0.9,
                           "minCashReservePct": 0.05, "maxDailyTrades": 5,
                           "maxOrderValue": 50000.0}
        }))
        .unwrap()
    }

    fn fixed(
        sig: &'static str,
        reply: Result<&'static str, ()>,
        delay_ms: u64,
    ) -> Arc<dyn OracleAdapter> {
        Arc::new(Fixed {
            sig,
            reply,
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[test]
    fn duplicate_signature_is_refused() {
        let mut m = MultiProviderManager::new();
        m.register(fixed("a", Ok(OK_BODY), 0)).unwrap();
        assert!(matches!(
            m.register(fixed("a", Ok(OK_BODY), 0)),
            Err(OracleError::Config(_))
        ));
        assert_eq!(m.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_signature() {
        let mut m = MultiProviderManager::new().with_call_cap(Duration::from_millis(200));
        m.register(fixed("good", Ok(OK_BODY), 0)).unwrap();
        m.register(fixed("down", Err(()), 0)).unwrap();
        m.register(fixed("garbage", Ok("no json here"), 0)).unwrap();
        m.register(fixed("slow", Ok(OK_BODY), 5_000)).unwrap();

        let out = m.generate_all_decisions("sys", &input()).await;
        assert_eq!(out.len(), 4);
        assert_eq!(out["good"].as_ref().unwrap().diagnostics.summary, "hold");
        assert!(matches!(out["down"], Err(OracleError::Transport(_))));
        assert!(matches!(out["garbage"], Err(OracleError::Unparseable(_))));
        assert!(matches!(out["slow"], Err(OracleError::Timeout { .. })));
    }

    #[tokio::test]
    async fn availability_maps_errors_to_false() {
        let mut m = MultiProviderManager::new().with_call_cap(Duration::from_millis(200));
        m.register(fixed("up", Ok(OK_BODY), 0)).unwrap();
        m.register(fixed("down", Err(()), 0)).unwrap();
        m.register(fixed("slow", Ok(OK_BODY), 5_000)).unwrap();

        let av = m.check_availability().await;
        assert!(av["up"]);
        assert!(!av["down"]);
        assert!(!av["slow"]);
    }
}
