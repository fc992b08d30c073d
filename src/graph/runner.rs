//! Sequential execution of a compiled workflow graph.
//!
//! One run serves one user turn: nodes execute one at a time, each mutating
//! the shared [`AgentState`] in place. The runner owns the two pieces of
//! control logic that are uniform across nodes rather than per-edge:
//!
//! - **error detection**: any agent (other than fallback itself) exiting
//!   with a recorded error routes into the fallback agent;
//! - **loop bounds**: fallback entries are counted and capped, and a global
//!   transition guard backstops every other cycle.

use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::agent::{AgentContext, AgentName};
use crate::state::{AgentState, CompletionStamp};

use super::{GraphError, WorkflowGraph, WorkflowNode};

/// Fixed apology used when recovery is exhausted.
pub const RECOVERY_EXHAUSTED_APOLOGY: &str =
    "I'm sorry, I was unable to process your request. Please try again.";

/// Errors escaping a whole graph run. The orchestrator converts these into
/// a terminal apology payload; they never reach the user as-is.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error("transition limit of {limit} exceeded")]
    #[diagnostic(
        code(colloquy::runner::transition_limit),
        help("A routing cycle escaped the replan and fallback bounds.")
    )]
    TransitionLimit { limit: u32 },
}

/// Drives one [`AgentState`] through the graph until the final-response
/// node completes.
pub struct WorkflowRunner {
    graph: Arc<WorkflowGraph>,
    ctx: AgentContext,
}

impl WorkflowRunner {
    #[must_use]
    pub fn new(graph: Arc<WorkflowGraph>, ctx: AgentContext) -> Self {
        Self { graph, ctx }
    }

    /// Runs the workflow to completion, returning the final state.
    pub async fn run(&self, mut state: AgentState) -> Result<AgentState, WorkflowError> {
        let limits = &self.ctx.config;
        let mut node = self.graph.entry();
        let mut transitions: u32 = 0;
        let mut fallback_attempts: u32 = 0;

        loop {
            transitions += 1;
            if transitions > limits.max_transitions {
                return Err(WorkflowError::TransitionLimit {
                    limit: limits.max_transitions,
                });
            }

            match node {
                WorkflowNode::Agent(name) => {
                    let agent = self.graph.agent(name).ok_or(GraphError::UnregisteredNode {
                        node: name.as_str(),
                    })?;
                    debug!(node = %name, transitions, "entering agent node");
                    self.ctx.events.emit(name.as_str(), "entering");
                    agent.run(&mut state, &self.ctx).await;

                    // Uniform error-detection edge: a recorded error routes
                    // into fallback, bounded by the recovery ceiling.
                    if state.error.error.is_some() && name != AgentName::Fallback {
                        if fallback_attempts >= limits.max_fallback_attempts {
                            warn!(
                                attempts = fallback_attempts,
                                "fallback ceiling reached, finishing with apology"
                            );
                            if state.response.response.is_none() {
                                state.response.response =
                                    Some(RECOVERY_EXHAUSTED_APOLOGY.to_string());
                            }
                            node = WorkflowNode::FinalResponse;
                            continue;
                        }
                        fallback_attempts += 1;
                        node = WorkflowNode::Agent(AgentName::Fallback);
                        continue;
                    }

                    node = self.graph.next(WorkflowNode::Agent(name), &state)?;
                }
                WorkflowNode::Dispatcher => {
                    // Pure routing node; the decision lives in its
                    // conditional edge.
                    debug!(plan_steps = state.processing.plan.0.len(), "dispatcher");
                    self.ctx.events.emit("dispatcher", "routing plan");
                    node = self.graph.next(WorkflowNode::Dispatcher, &state)?;
                }
                WorkflowNode::FinalResponse => {
                    state.response.metadata.completed = Some(CompletionStamp {
                        finished_at: chrono::Utc::now(),
                        workflow_completed: true,
                    });
                    state.processing.is_processing = false;
                    self.ctx.events.emit("final_response", "workflow completed");
                    debug!(transitions, "workflow completed");
                    return Ok(state);
                }
            }
        }
    }
}
