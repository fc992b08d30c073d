//! Feedback agent: judges whether the current answer is good enough.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::providers::{CompletionRequest, complete_structured};
use crate::state::{AgentState, FeedbackVerdict};

use super::rerun_addendum;

#[derive(Debug, Deserialize)]
struct FeedbackOutput {
    proceed: bool,
}

/// Decides whether the workflow proceeds to the final response or loops back
/// to the planning agent for another pass.
///
/// This is the sole place `replan_attempts` is incremented; the graph edge
/// enforces the loop bound on top of the recorded verdict.
pub struct FeedbackAgent;

#[async_trait]
impl Agent for FeedbackAgent {
    fn name(&self) -> AgentName {
        AgentName::Feedback
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if let Err(err) = self.judge(state, ctx).await {
            state.fail(AgentName::Feedback, format!("Feedback agent error: {err}"));
        }
    }
}

impl FeedbackAgent {
    async fn judge(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let rerun = state.rerun_directive(AgentName::Feedback);
        let answer = state.response.response.clone().unwrap_or_default();

        let mut system = format!(
            "You are the feedback agent of a multi-agent assistant. The \
             current date and time is {}.\n\
             Given the user's input and the answer produced so far, decide \
             whether the workflow should proceed or replan with different \
             tools.\n\
             Reply with ONLY a JSON object with one key: \"proceed\" (true \
             when the answer is sufficient, false when replanning is needed).",
            Utc::now().to_rfc3339()
        );
        if let Some(directive) = &rerun {
            system.push_str(&rerun_addendum(directive));
        }

        let request = CompletionRequest::new(
            system,
            format!(
                "User input: {}\n---\nAnswer: {answer}\n---\nReturn only the JSON object:",
                state.processing.user_input
            ),
        );

        let output: FeedbackOutput = complete_structured(ctx.completion.as_ref(), request).await?;
        info!(proceed = output.proceed, attempts = state.processing.replan_attempts, "feedback verdict");
        ctx.events.emit(
            AgentName::Feedback.as_str(),
            if output.proceed { "proceed" } else { "replan" },
        );

        if rerun.is_some() {
            state.clear_error();
        }
        state.response.metadata.feedback = Some(FeedbackVerdict {
            proceed: output.proceed,
        });
        if !output.proceed {
            state.processing.replan_attempts += 1;
        }
        state.record_pass(AgentName::Feedback);
        Ok(())
    }
}
