use std::fmt;

/// Where a [`crate::TradingAgent`] is within one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    BuildingInput,
    AwaitingDecision,
    ValidatingOrders,
    Applying,
    /// Day finished normally; the decision may still have zero orders.
    Done,
    /// Day ended with an empty decision (input error or oracle failure).
    Failed,
}

impl AgentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Idle => "idle",
            AgentPhase::BuildingInput => "building_input",
            AgentPhase::AwaitingDecision => "awaiting_decision",
            AgentPhase::ValidatingOrders => "validating_orders",
            AgentPhase::Applying => "applying",
            AgentPhase::Done => "done",
            AgentPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentPhase::Done | AgentPhase::Failed)
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
