//! Content moderation agent: safety-aware terminal replies.

use async_trait::async_trait;
use chrono::Utc;

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::providers::CompletionRequest;
use crate::state::AgentState;

use super::{APOLOGY, rerun_addendum};

/// Terminal specialist for flagged content.
///
/// Produces a supportive, non-judgmental message when the input is harmful
/// or self-harm-adjacent, and an ordinary helpful reply otherwise.
pub struct ContentModerationAgent;

#[async_trait]
impl Agent for ContentModerationAgent {
    fn name(&self) -> AgentName {
        AgentName::ContentModeration
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if let Err(err) = self.moderate(state, ctx).await {
            state.response.response = Some(APOLOGY.to_string());
            state.fail(
                AgentName::ContentModeration,
                format!("Content moderation error: {err}"),
            );
        }
    }
}

impl ContentModerationAgent {
    async fn moderate(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let rerun = state.rerun_directive(AgentName::ContentModeration);

        let mut system = format!(
            "You are the safety and content-moderation agent of a multi-agent \
             assistant. The current date and time is {}.\n\
             If the user's input indicates harmful, dangerous or sensitive \
             content (self-harm, suicide, violence and the like), respond with \
             a supportive, non-judgmental message encouraging them to seek \
             help. Otherwise give a clear, concise, helpful reply.",
            Utc::now().to_rfc3339()
        );
        if let Some(directive) = &rerun {
            system.push_str(&rerun_addendum(directive));
        }

        let request = CompletionRequest::new(
            system,
            format!("User input: {}", state.processing.user_input),
        )
        .with_history(state.history_tail(ctx.config.history_tail));

        let reply = ctx.completion.complete(request).await?;
        if rerun.is_some() {
            state.clear_error();
        }
        state.response.response = Some(reply.trim().to_string());
        state.record_pass(AgentName::ContentModeration);
        Ok(())
    }
}
