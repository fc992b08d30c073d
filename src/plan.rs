//! Typed execution plans produced by the planning agent.
//!
//! A plan is an ordered list of agent steps, each carrying the tool calls
//! that step wants executed. Step agent names are validated at the planning
//! boundary; tool names stay raw strings so the executor can skip unknown
//! tools instead of failing the plan.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::agent::AgentName;

/// One tool invocation within a plan step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: FxHashMap<String, serde_json::Value>,
}

impl ToolCall {
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    /// Convenience accessor for the conventional string-valued `query` arg.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.args.get("query").and_then(|v| v.as_str())
    }
}

/// One step of a plan: a specialist agent plus its tool calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub agent: AgentName,
    #[serde(default)]
    pub tools: Vec<ToolCall>,
}

/// Where the dispatcher should send a plan next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchTarget {
    Analysis,
    Summarization,
    FinalResponse,
}

/// An ordered list of plan steps. May be empty; the dispatcher then routes
/// straight to the final response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan(pub Vec<PlanStep>);

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains_agent(&self, agent: AgentName) -> bool {
        self.0.iter().any(|step| step.agent == agent)
    }

    /// First step addressed to `agent`, if any.
    #[must_use]
    pub fn step_for(&self, agent: AgentName) -> Option<&PlanStep> {
        self.0.iter().find(|step| step.agent == agent)
    }

    /// Deterministic dispatch priority: analysis wins over summarization,
    /// and a plan naming neither goes straight to the final response.
    #[must_use]
    pub fn dispatch_target(&self) -> DispatchTarget {
        if self.contains_agent(AgentName::Analysis) {
            DispatchTarget::Analysis
        } else if self.contains_agent(AgentName::Summarization) {
            DispatchTarget::Summarization
        } else {
            DispatchTarget::FinalResponse
        }
    }
}
