//! Planning agent: breaks a request into an ordered agent/tool plan.

use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::agent::{Agent, AgentContext, AgentError, AgentName};
use crate::executor::{RAG_TOOL, WEB_SEARCH_TOOL};
use crate::plan::{Plan, PlanStep, ToolCall};
use crate::providers::{CompletionRequest, complete_structured};
use crate::state::AgentState;

use super::rerun_addendum;

/// Raw plan shape as produced by the completion, before validation.
#[derive(Debug, Deserialize)]
struct PlanOutput {
    #[serde(default)]
    plan: Vec<RawPlanStep>,
}

#[derive(Debug, Deserialize)]
struct RawPlanStep {
    agent: String,
    #[serde(default)]
    tools: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    tool: String,
    #[serde(default)]
    args: FxHashMap<String, serde_json::Value>,
}

/// Produces the ordered plan the dispatcher and specialists consume.
///
/// The completion's raw plan is validated at this boundary: steps naming an
/// agent outside the dispatchable set are dropped with a warning. An empty
/// plan is legal; the dispatcher then routes straight to the final response.
pub struct PlanningAgent;

#[async_trait]
impl Agent for PlanningAgent {
    fn name(&self) -> AgentName {
        AgentName::Planning
    }

    async fn run(&self, state: &mut AgentState, ctx: &AgentContext) {
        if let Err(err) = self.plan(state, ctx).await {
            state.fail(AgentName::Planning, format!("Planning error: {err}"));
        }
    }
}

impl PlanningAgent {
    async fn plan(&self, state: &mut AgentState, ctx: &AgentContext) -> Result<(), AgentError> {
        let rerun = state.rerun_directive(AgentName::Planning);

        let mut system = format!(
            "You are the planning agent of a multi-agent assistant. The \
             current date and time is {}.\n\
             Break the user's request into an ordered plan of agent steps:\n{}\n\
             Each step has an \"agent\" name and a \"tools\" list; each tool \
             call has a \"tool\" name and an \"args\" object (use a \"query\" \
             string argument). Steps may carry an empty tools list.\n\
             Reply with ONLY a JSON object with a \"plan\" key holding the \
             list of steps.",
            Utc::now().to_rfc3339(),
            registry_rendering()
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

        let output: PlanOutput = complete_structured(ctx.completion.as_ref(), request).await?;
        let plan = validate_plan(output);
        info!(steps = plan.0.len(), "plan generated");
        ctx.events.emit(
            AgentName::Planning.as_str(),
            format!("plan with {} step(s)", plan.0.len()),
        );

        if rerun.is_some() {
            state.clear_error();
        }
        state.processing.plan = plan;
        state.record_pass(AgentName::Planning);
        Ok(())
    }
}

/// Renders the dispatchable agents and their tools for the planning prompt.
fn registry_rendering() -> String {
    let tools = format!("{RAG_TOOL}, {WEB_SEARCH_TOOL}");
    [
        format!(
            "- analysis_agent: analyzing, comparing or synthesizing information (tools: {tools})"
        ),
        format!(
            "- summarization_agent: summarizing documents or the conversation (tools: {tools})"
        ),
    ]
    .join("\n")
}

/// Keeps only steps addressed to dispatchable specialists.
fn validate_plan(output: PlanOutput) -> Plan {
    let steps = output
        .plan
        .into_iter()
        .filter_map(|raw| {
            let agent = match raw.agent.parse::<AgentName>() {
                Ok(agent) if AgentName::DISPATCHABLE.contains(&agent) => agent,
                _ => {
                    warn!(agent = %raw.agent, "dropping plan step for non-dispatchable agent");
                    return None;
                }
            };
            let tools = raw
                .tools
                .into_iter()
                .map(|call| ToolCall {
                    tool: call.tool,
                    args: call.args,
                })
                .collect();
            Some(PlanStep { agent, tools })
        })
        .collect();
    Plan(steps)
}
