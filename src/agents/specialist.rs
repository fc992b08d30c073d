//! Specialist executors: analysis and summarization.
//!
//! Both share one shape: locate their own step in the plan, run its tool
//! calls through the executor, then synthesize a natural-language answer
//! from the collected tool outputs plus chat history.

use async_trait::async_trait;
use chrono::Utc;

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::executor::execute_tool_calls;
use crate::providers::CompletionRequest;
use crate::state::AgentState;

use super::{APOLOGY, rerun_addendum};

/// A plan-driven specialist agent.
///
/// When the plan has no step for this agent (or the step carries no tools),
/// the agent is a passthrough that still marks itself as the current agent.
pub struct SpecialistAgent {
    name: AgentName,
    domain: &'static str,
    task_blurb: &'static str,
}

impl SpecialistAgent {
    /// The analysis specialist: compares and synthesizes retrieved material.
    #[must_use]
    pub fn analysis() -> Self {
        Self {
            name: AgentName::Analysis,
            domain: "Analysis",
            task_blurb: "analyze, compare and synthesize the material to answer the user's request",
        }
    }

    /// The summarization specialist: condenses documents or conversation.
    #[must_use]
    pub fn summarization() -> Self {
        Self {
            name: AgentName::Summarization,
            domain: "Summarization",
            task_blurb: "summarize the user's documents or conversation",
        }
    }
}

#[async_trait]
impl Agent for SpecialistAgent {
    fn name(&self) -> AgentName {
        self.name
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if let Err(err) = self.execute(state, ctx).await {
            state.response.response = Some(APOLOGY.to_string());
            state.fail(self.name, format!("{} error: {err}", self.domain));
        }
    }
}

impl SpecialistAgent {
    async fn execute(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let rerun = state.rerun_directive(self.name);

        let Some(tools) = state
            .processing
            .plan
            .step_for(self.name)
            .filter(|step| !step.tools.is_empty())
            .map(|step| step.tools.clone())
        else {
            tracing::warn!(agent = %self.name, "no tools planned, passing through");
            state.processing.current_agent = Some(self.name);
            return Ok(());
        };

        execute_tool_calls(ctx.tools.as_ref(), state, &tools).await;
        ctx.events.emit(
            self.name.as_str(),
            format!("executed {} tool call(s)", state.response.tool_responses.len()),
        );

        let context = if state.response.tool_responses.is_empty() {
            state.response.response.clone().unwrap_or_default()
        } else {
            state
                .response
                .tool_responses
                .iter()
                .map(|r| r.response.as_str())
                .collect::<Vec<_>>()
                .join("\n---\n")
        };

        let mut system = format!(
            "You are a helpful assistant. The current date and time is {}.\n\
             Use the provided context and the chat history to {}.\n\
             Context:\n{context}\n\
             Answer naturally; never mention tools, retrieval or how the \
             context was gathered.",
            Utc::now().to_rfc3339(),
            self.task_blurb
        );
        if let Some(directive) = &rerun {
            system.push_str(&rerun_addendum(directive));
        }

        let request = CompletionRequest::new(
            system,
            format!("User request: {}", state.processing.user_input),
        )
        .with_history(state.history_tail(ctx.config.history_tail));

        let reply = ctx.completion.complete(request).await?;
        if rerun.is_some() {
            state.clear_error();
        }
        state.response.response = Some(reply.trim().to_string());
        state.record_pass(self.name);
        Ok(())
    }
}
