use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use pdk_oracle::{OracleAdapter, OracleError, ProviderKind};
use pdk_schemas::AgentInput;

/// One scripted answer to a decision request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Raw model text, parsed like a real backend's output.
    Text(String),
    /// Transport-level failure.
    Fail(String),
    /// Sleep, then answer; used to trip timeouts.
    Delayed(Duration, String),
}

/// Oracle that answers from a queue. When the queue is empty it fails, so a
/// test never silently trades on a missing script entry.
pub struct ScriptedOracle {
    signature: String,
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(signature: &str) -> Self {
        Self {
            signature: signature.to_string(),
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(message.into()))
    }

    pub fn delayed(self, after: Duration, text: impl Into<String>) -> Self {
        self.push(Reply::Delayed(after, text.into()))
    }

    fn push(self, r: Reply) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(r);
        }
        self
    }

    /// Every input the oracle was asked about, in call order.
    pub fn inputs(&self) -> Vec<AgentInput> {
        self.prompts
            .lock()
            .map(|p| {
                p.iter()
                    .filter_map(|s| serde_json::from_str(s).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl OracleAdapter for ScriptedOracle {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(user_prompt.to_string());
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Reply::Text(t)) => Ok(t),
            Some(Reply::Fail(m)) => Err(OracleError::Transport(m)),
            Some(Reply::Delayed(after, t)) => {
                tokio::time::sleep(after).await;
                Ok(t)
            }
            None => Err(OracleError::Transport("script exhausted".to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        Ok(vec!["scripted".to_string()])
    }
}
