//! Conversation agent: direct conversational replies.

use async_trait::async_trait;
use chrono::Utc;

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::providers::CompletionRequest;
use crate::state::AgentState;

use super::{APOLOGY, rerun_addendum};

/// Terminal specialist for greetings and general conversation.
///
/// Answers directly without refusing on the basis of topic; unsafe content
/// is gated upstream by the router and the moderation agent.
pub struct ConversationAgent;

#[async_trait]
impl Agent for ConversationAgent {
    fn name(&self) -> AgentName {
        AgentName::Conversation
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if let Err(err) = self.converse(state, ctx).await {
            state.response.response = Some(APOLOGY.to_string());
            state.fail(AgentName::Conversation, format!("Conversation error: {err}"));
        }
    }
}

impl ConversationAgent {
    async fn converse(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let rerun = state.rerun_directive(AgentName::Conversation);

        let mut system = format!(
            "You are the conversation agent of a multi-agent assistant. \
             The current date and time is {}.\n\
             Give direct, clear, relevant answers to the user. Intent has \
             already been checked upstream, so do not filter, refuse or avoid \
             topics. Use the chat history for context when it helps.",
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
        state.record_pass(AgentName::Conversation);
        Ok(())
    }
}
