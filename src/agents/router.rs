//! Routing agent: decides which specialist handles the turn.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::providers::{CompletionError, CompletionRequest, complete_structured};
use crate::state::AgentState;

use super::rerun_addendum;

/// Structured reply expected from the routing completion.
#[derive(Debug, Deserialize)]
struct RouteDecision {
    agent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    requires_context: bool,
    #[serde(default)]
    is_greeting: bool,
}

/// Decides between the conversation, planning and content-moderation agents
/// using the current input and history for disambiguation.
///
/// Empty input short-circuits straight to the fallback route without any
/// completion call. Note the deliberate quirk carried from the reference
/// design: on success `current_agent` is set to the route target, not to
/// the router itself.
pub struct RouterAgent;

#[async_trait]
impl Agent for RouterAgent {
    fn name(&self) -> AgentName {
        AgentName::Router
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if state.processing.user_input.trim().is_empty() {
            state.processing.route_decision = Some(AgentName::Fallback);
            state.error.error = Some("No user input provided".to_string());
            state.processing.current_agent = Some(AgentName::Router);
            return;
        }
        if let Err(err) = self.route(state, ctx).await {
            state.processing.route_decision = Some(AgentName::Fallback);
            state.fail(AgentName::Router, format!("Routing error: {err}"));
        }
    }
}

impl RouterAgent {
    async fn route(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let rerun = state.rerun_directive(AgentName::Router);

        let mut system = format!(
            "You are the routing agent of a multi-agent assistant. \
             The current date and time is {}.\n\
             Pick exactly one agent for the user's turn:\n\
             1. 'conversation_agent' for greetings, onboarding, general questions, \
             or conversational turns with unclear intent.\n\
             2. 'planning_agent' for requests needing multi-step reasoning or \
             chaining tools (document retrieval, summarization, analysis).\n\
             3. 'content_moderation_agent' for inappropriate, harmful or unsafe content.\n\
             Reply with ONLY a JSON object with keys: \"agent\" (one of the three \
             names), \"confidence\" (0..1), \"reasoning\", \"requires_context\" \
             (bool), \"is_greeting\" (bool).",
            Utc::now().to_rfc3339()
        );
        if let Some(directive) = &rerun {
            system.push_str(&rerun_addendum(directive));
        }

        let request = CompletionRequest::new(
            system,
            format!(
                "User input: {}\n\nReturn only the JSON object:",
                state.processing.user_input
            ),
        )
        .with_history(state.history_tail(ctx.config.history_tail));

        let decision: RouteDecision =
            complete_structured(ctx.completion.as_ref(), request).await?;
        let target: AgentName = decision.agent.parse().map_err(|_| {
            CompletionError::UnparseableReply {
                reason: format!("unknown route target: {}", decision.agent),
            }
        })?;
        if !AgentName::ROUTABLE.contains(&target) {
            return Err(CompletionError::UnparseableReply {
                reason: format!("non-routable target: {target}"),
            }
            .into());
        }

        info!(
            target = %target,
            confidence = decision.confidence,
            greeting = decision.is_greeting,
            requires_context = decision.requires_context,
            reasoning = %decision.reasoning,
            "routing decision"
        );
        ctx.events
            .emit(AgentName::Router.as_str(), format!("routed to {target}"));

        if rerun.is_some() {
            state.clear_error();
        }
        state.processing.route_decision = Some(target);
        state.processing.confidence_score = Some(decision.confidence.clamp(0.0, 1.0));
        // Route target becomes the current agent; the conditional edge and
        // downstream rerun checks key off this.
        state.processing.current_agent = Some(target);
        state.processing.executed_steps.push(AgentName::Router);
        state.response.metadata.agent_type = Some(target);
        state.response.metadata.processing_time = Some(Utc::now());
        Ok(())
    }
}
