//! Per-request workflow state threaded through every graph node.
//!
//! Exactly one [`AgentState`] flows through a single workflow run. Nodes
//! mutate it in place and hand it to the next node; loop-backs (replanning,
//! fallback reruns) re-enter with the same instance, accumulating
//! `executed_steps` and counters. There is no forking of state within one
//! request.
//!
//! Cross-agent signals that the original design carried in an open metadata
//! bag are typed here: [`RerunSignal`], [`FeedbackVerdict`] and
//! [`CompletionStamp`] inside [`ResponseMetadata`].

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::agent::AgentName;
use crate::message::Message;
use crate::plan::Plan;
use crate::providers::RetrievedDocument;
use crate::store::LongTermHistory;

/// Processing bookkeeping for the current turn.
#[derive(Clone, Debug, Default)]
pub struct ProcessingState {
    pub user_input: String,
    pub is_processing: bool,
    /// Name of the last agent to run. The router deliberately sets this to
    /// its route target rather than itself; the conditional edge and the
    /// rerun protocol both key off this field.
    pub current_agent: Option<AgentName>,
    pub route_decision: Option<AgentName>,
    pub confidence_score: Option<f64>,
    pub plan: Plan,
    /// Incremented only by the feedback agent, on a `proceed = false` verdict.
    pub replan_attempts: u32,
    /// Append-only audit trail of agents that completed successfully.
    pub executed_steps: Vec<AgentName>,
    pub last_tool: Option<String>,
}

/// Documents retrieved during this request, keyed by chat id by convention.
/// Accumulates across agents within one request.
#[derive(Clone, Debug, Default)]
pub struct RetrievalState {
    pub chat_id: String,
    pub retrieved: FxHashMap<String, Vec<RetrievedDocument>>,
}

/// Outcome of one tool invocation, in plan order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: String,
    pub args: FxHashMap<String, serde_json::Value>,
    pub response: String,
}

/// Remediation signal produced by the fallback agent.
///
/// `agent` stays a raw string because it is model output; the graph resolves
/// it against known agents at the edge via [`RerunSignal::target`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RerunSignal {
    pub agent: String,
    pub solution: String,
}

impl RerunSignal {
    /// The rerun target, when it names a known agent.
    #[must_use]
    pub fn target(&self) -> Option<AgentName> {
        self.agent.parse().ok()
    }
}

/// Verdict recorded by the feedback agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackVerdict {
    pub proceed: bool,
}

/// Terminal stamp applied by the final-response node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStamp {
    pub finished_at: DateTime<Utc>,
    pub workflow_completed: bool,
}

/// Typed cross-agent signals riding alongside the response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub agent_type: Option<AgentName>,
    pub processing_time: Option<DateTime<Utc>>,
    pub rerun: Option<RerunSignal>,
    pub feedback: Option<FeedbackVerdict>,
    pub completed: Option<CompletionStamp>,
}

/// The response under construction for this turn.
#[derive(Clone, Debug, Default)]
pub struct ResponseState {
    pub response: Option<String>,
    pub tool_responses: Vec<ToolResponse>,
    pub metadata: ResponseMetadata,
}

/// Error surface for the turn. A non-empty `error` after an agent exits is
/// what routes the run into the fallback agent.
#[derive(Clone, Debug, Default)]
pub struct ErrorState {
    pub error: Option<String>,
    pub details: FxHashMap<String, serde_json::Value>,
}

/// Context handed to an agent that is being rerun after a fallback.
#[derive(Clone, Debug)]
pub struct RerunDirective {
    pub solution: String,
    pub original_error: String,
}

/// The composite state object for one user turn.
pub struct AgentState {
    pub user_id: String,
    pub chat_id: String,
    /// Context-window snapshot taken at request start; read-only for agents.
    pub chat_history: Vec<Message>,
    pub processing: ProcessingState,
    pub retrieval: RetrievalState,
    pub response: ResponseState,
    pub error: ErrorState,
    /// Read-only clone of the user's long-term history for agents needing
    /// more context than the window provides.
    pub long_term_context: Option<LongTermHistory>,
}

impl AgentState {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        chat_id: impl Into<String>,
        user_input: impl Into<String>,
        chat_history: Vec<Message>,
    ) -> Self {
        let chat_id = chat_id.into();
        Self {
            user_id: user_id.into(),
            chat_history,
            processing: ProcessingState {
                user_input: user_input.into(),
                is_processing: true,
                ..ProcessingState::default()
            },
            retrieval: RetrievalState {
                chat_id: chat_id.clone(),
                retrieved: FxHashMap::default(),
            },
            response: ResponseState::default(),
            error: ErrorState::default(),
            long_term_context: None,
            chat_id,
        }
    }

    #[must_use]
    pub fn with_long_term_context(mut self, history: LongTermHistory) -> Self {
        self.long_term_context = Some(history);
        self
    }

    /// Marks `agent` as having completed successfully: records it as the
    /// current agent, appends it to the audit trail, and stamps the
    /// response metadata.
    pub fn record_pass(&mut self, agent: AgentName) {
        self.processing.current_agent = Some(agent);
        self.processing.executed_steps.push(agent);
        self.response.metadata.agent_type = Some(agent);
        self.response.metadata.processing_time = Some(Utc::now());
    }

    /// Records a failure at the agent boundary: sets the error message and
    /// the current agent, without touching the audit trail.
    pub fn fail(&mut self, agent: AgentName, error: impl Into<String>) {
        let error = error.into();
        tracing::error!(agent = %agent, %error, "agent failure recorded");
        self.error.error = Some(error);
        self.processing.current_agent = Some(agent);
    }

    /// Returns the rerun directive for `agent` when the fallback agent has
    /// just run and nominated `agent` as its rerun target with a non-empty
    /// solution. Consuming agents weave the solution and original error into
    /// their prompt and clear the error on success.
    #[must_use]
    pub fn rerun_directive(&self, agent: AgentName) -> Option<RerunDirective> {
        if self.processing.current_agent != Some(AgentName::Fallback) {
            return None;
        }
        let rerun = self.response.metadata.rerun.as_ref()?;
        if rerun.target() != Some(agent) || rerun.solution.is_empty() {
            return None;
        }
        Some(RerunDirective {
            solution: rerun.solution.clone(),
            original_error: self.error.error.clone().unwrap_or_default(),
        })
    }

    /// Clears the error surface after a successful fallback-informed rerun,
    /// so the uniform error edge does not re-fire on the stale message.
    pub fn clear_error(&mut self) {
        self.error.error = None;
        self.error.details.clear();
    }

    /// The trailing slice of chat history agents feed into prompts.
    #[must_use]
    pub fn history_tail(&self, limit: usize) -> &[Message] {
        let start = self.chat_history.len().saturating_sub(limit);
        &self.chat_history[start..]
    }
}
