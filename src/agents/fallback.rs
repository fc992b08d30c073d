//! Fallback agent: turns a recorded error into a remediation hint and a
//! rerun target.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::providers::{CompletionRequest, complete_structured};
use crate::state::{AgentState, RerunSignal};

use super::{APOLOGY, rerun_addendum};

#[derive(Debug, Deserialize)]
struct FallbackOutput {
    rerun_agent: String,
    solution: String,
}

/// Recovery agent entered whenever another agent records an error.
///
/// Asks the completion for exactly `{rerun_agent, solution}` and publishes
/// the pair as the typed rerun signal. The graph re-enters the named agent;
/// a self-target or unknown target ends the run instead (no recursion).
pub struct FallbackAgent;

#[async_trait]
impl Agent for FallbackAgent {
    fn name(&self) -> AgentName {
        AgentName::Fallback
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if let Err(err) = self.recover(state, ctx).await {
            state.response.response = Some(APOLOGY.to_string());
            state.fail(AgentName::Fallback, format!("Fallback agent error: {err}"));
        }
    }
}

impl FallbackAgent {
    async fn recover(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let error = state
            .error
            .error
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string());
        let failed_agent = state
            .processing
            .current_agent
            .map(|a| a.as_str())
            .unwrap_or("unknown_agent");
        // A fallback-targeted rerun signal means this agent itself failed
        // last time around; fold the earlier solution into the prompt.
        let rerun = state.rerun_directive(AgentName::Fallback);

        let mut system = format!(
            "You are the fallback agent of a multi-agent assistant. The \
             current date and time is {}.\n\
             You receive an error message and the name of the agent that \
             failed. Reply with ONLY a JSON object with two keys:\n\
             - \"rerun_agent\": the agent to rerun (the one that failed)\n\
             - \"solution\": a concise, actionable fix so the error does not \
             recur (clarify the input, suggest a correction, or rephrase the \
             request).",
            Utc::now().to_rfc3339()
        );
        if let Some(directive) = &rerun {
            system.push_str(&rerun_addendum(directive));
        }

        let request = CompletionRequest::new(
            system,
            format!(
                "Error: {error}\nPrevious agent: {failed_agent}\n\
                 Return only the JSON object:"
            ),
        );

        let output: FallbackOutput = complete_structured(ctx.completion.as_ref(), request).await?;
        info!(rerun_agent = %output.rerun_agent, "fallback remediation produced");
        ctx.events.emit(
            AgentName::Fallback.as_str(),
            format!("rerun {} with a suggested fix", output.rerun_agent),
        );

        state.response.response =
            Some("No response from the previous agent. Please try again.".to_string());
        state.response.metadata.rerun = Some(RerunSignal {
            agent: output.rerun_agent,
            solution: output.solution,
        });
        state.record_pass(AgentName::Fallback);
        Ok(())
    }
}
