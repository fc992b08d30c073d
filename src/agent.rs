//! The agent contract: the uniform capability every workflow node implements.
//!
//! An agent consumes the shared [`AgentState`], mutates it, and never lets a
//! fault escape its boundary: internal failures are converted into an
//! [`ErrorState`](crate::state::ErrorState) entry with a domain prefix, and
//! the graph routes the run into the fallback agent from there.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::events::EventSender;
use crate::executor::ToolRegistry;
use crate::providers::{CompletionError, CompletionProvider};
use crate::state::AgentState;

/// Identity of a workflow agent.
///
/// The serialized form is the wire name used in plans, rerun signals, the
/// audit trail and the streaming surface (`"router_agent"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentName {
    #[serde(rename = "router_agent")]
    Router,
    #[serde(rename = "conversation_agent")]
    Conversation,
    #[serde(rename = "planning_agent")]
    Planning,
    #[serde(rename = "analysis_agent")]
    Analysis,
    #[serde(rename = "summarization_agent")]
    Summarization,
    #[serde(rename = "content_moderation_agent")]
    ContentModeration,
    #[serde(rename = "feedback_agent")]
    Feedback,
    #[serde(rename = "fallback_agent")]
    Fallback,
}

impl AgentName {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Router => "router_agent",
            AgentName::Conversation => "conversation_agent",
            AgentName::Planning => "planning_agent",
            AgentName::Analysis => "analysis_agent",
            AgentName::Summarization => "summarization_agent",
            AgentName::ContentModeration => "content_moderation_agent",
            AgentName::Feedback => "feedback_agent",
            AgentName::Fallback => "fallback_agent",
        }
    }

    /// Agents the router may pick as a route target.
    pub const ROUTABLE: [AgentName; 3] = [
        AgentName::Conversation,
        AgentName::Planning,
        AgentName::ContentModeration,
    ];

    /// Agents the planner may address in a plan step.
    pub const DISPATCHABLE: [AgentName; 2] = [AgentName::Analysis, AgentName::Summarization];
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known agent.
#[derive(Debug, Error, Diagnostic)]
#[error("unknown agent name: {0}")]
#[diagnostic(code(colloquy::agent::unknown_name))]
pub struct ParseAgentNameError(pub String);

impl FromStr for AgentName {
    type Err = ParseAgentNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "router_agent" => Ok(AgentName::Router),
            "conversation_agent" => Ok(AgentName::Conversation),
            "planning_agent" => Ok(AgentName::Planning),
            "analysis_agent" => Ok(AgentName::Analysis),
            "summarization_agent" => Ok(AgentName::Summarization),
            "content_moderation_agent" => Ok(AgentName::ContentModeration),
            "feedback_agent" => Ok(AgentName::Feedback),
            "fallback_agent" => Ok(AgentName::Fallback),
            other => Err(ParseAgentNameError(other.to_string())),
        }
    }
}

/// Execution environment handed to each agent invocation.
///
/// Cheap to clone: everything behind it is shared.
#[derive(Clone)]
pub struct AgentContext {
    pub completion: Arc<dyn CompletionProvider>,
    pub tools: Arc<ToolRegistry>,
    pub config: Config,
    pub events: EventSender,
}

impl AgentContext {
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        tools: Arc<ToolRegistry>,
        config: Config,
        events: EventSender,
    ) -> Self {
        Self {
            completion,
            tools,
            config,
            events,
        }
    }
}

/// Failures internal to an agent body.
///
/// These never cross the agent boundary: each agent maps them into a
/// domain-prefixed entry on the error state via [`AgentState::fail`].
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    /// The completion provider failed or returned an unusable reply.
    #[error(transparent)]
    #[diagnostic(code(colloquy::agent::completion))]
    Completion(#[from] CompletionError),

    /// A required piece of state was absent.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(colloquy::agent::missing_input),
        help("Check that the upstream node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// JSON handling failed outside the provider layer.
    #[error(transparent)]
    #[diagnostic(code(colloquy::agent::serde_json))]
    Serde(#[from] serde_json::Error),
}

/// A workflow node that consumes and produces the shared per-turn state.
///
/// `run` is infallible at the boundary by contract: implementations catch
/// all internal errors, record them on the state with a domain prefix, and
/// return a best-effort state. The workflow graph must never observe an
/// unhandled fault from a node.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> AgentName;

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for agent in [
            AgentName::Router,
            AgentName::Conversation,
            AgentName::Planning,
            AgentName::Analysis,
            AgentName::Summarization,
            AgentName::ContentModeration,
            AgentName::Feedback,
            AgentName::Fallback,
        ] {
            assert_eq!(agent.as_str().parse::<AgentName>().unwrap(), agent);
        }
        assert!("mystery_agent".parse::<AgentName>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&AgentName::ContentModeration).unwrap(),
            "\"content_moderation_agent\""
        );
        assert_eq!(
            serde_json::from_str::<AgentName>("\"analysis_agent\"").unwrap(),
            AgentName::Analysis
        );
    }
}
