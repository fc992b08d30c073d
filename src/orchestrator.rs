//! The orchestrator: wires the workflow graph, owns the conversation store,
//! and serves one user turn end to end.
//!
//! `process_user_input` is the top-level entry: it snapshots the chat into a
//! fresh [`AgentState`], drives the graph, persists the assistant reply and
//! runs summarization bookkeeping. Whatever escapes the graph run degrades
//! to a fixed apology payload here; nothing propagates further.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::agent::{AgentContext, AgentName};
use crate::agents::{
    ContentModerationAgent, ConversationAgent, FallbackAgent, FeedbackAgent, PlanningAgent,
    RouterAgent, SpecialistAgent,
};
use crate::config::Config;
use crate::events::EventSender;
use crate::executor::ToolRegistry;
use crate::graph::{GraphBuilder, GraphError, WorkflowGraph, WorkflowNode, WorkflowRunner};
use crate::message::{Message, Role};
use crate::plan::DispatchTarget;
use crate::providers::{CompletionProvider, DocumentRetriever, WebSearchProvider};
use crate::state::{AgentState, ResponseMetadata, ToolResponse};
use crate::store::{ChatSummary, StateManager};
use crate::stream::{StreamItem, items_for_turn};

/// Apology used when an error escapes the whole graph invocation.
pub const TOP_LEVEL_APOLOGY: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again.";

/// Metadata block of a finished turn: the typed response metadata plus the
/// audit trail and tool outputs.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TurnMetadata {
    #[serde(flatten)]
    pub response: ResponseMetadata,
    pub executed_steps: Vec<AgentName>,
    pub tool_responses: Vec<ToolResponse>,
}

/// Result payload of one user turn.
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    pub response: Option<String>,
    pub agent_used: Option<AgentName>,
    pub route_decision: Option<AgentName>,
    pub confidence_score: Option<f64>,
    pub metadata: TurnMetadata,
    pub error: Option<String>,
}

impl TurnOutcome {
    fn from_state(state: AgentState) -> Self {
        Self {
            response: state.response.response.clone(),
            agent_used: state.processing.current_agent,
            route_decision: state.processing.route_decision,
            confidence_score: state.processing.confidence_score,
            metadata: TurnMetadata {
                response: state.response.metadata,
                executed_steps: state.processing.executed_steps,
                tool_responses: state.response.tool_responses,
            },
            error: state.error.error,
        }
    }

    /// Terminal apology payload for errors escaping the graph run. The
    /// moderation agent is reported as the safe-default handler.
    fn apology(error: String) -> Self {
        Self {
            response: Some(TOP_LEVEL_APOLOGY.to_string()),
            agent_used: Some(AgentName::ContentModeration),
            route_decision: None,
            confidence_score: None,
            metadata: TurnMetadata::default(),
            error: Some(error),
        }
    }
}

/// The assembled engine: conversation store, compiled graph, shared context.
pub struct Orchestrator {
    state_manager: Arc<StateManager>,
    graph: Arc<WorkflowGraph>,
    ctx: AgentContext,
}

impl Orchestrator {
    /// Builds the engine around the three external collaborators.
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        retriever: Arc<dyn DocumentRetriever>,
        search: Arc<dyn WebSearchProvider>,
        config: Config,
    ) -> Result<Self, GraphError> {
        Self::with_events(completion, retriever, search, config, EventSender::disabled())
    }

    /// Like [`Orchestrator::new`], with a run-event channel attached.
    pub fn with_events(
        completion: Arc<dyn CompletionProvider>,
        retriever: Arc<dyn DocumentRetriever>,
        search: Arc<dyn WebSearchProvider>,
        config: Config,
        events: EventSender,
    ) -> Result<Self, GraphError> {
        let tools = Arc::new(ToolRegistry::standard(
            retriever,
            search,
            config.web_search_max_results,
        ));
        let graph = Arc::new(build_workflow_graph(&config)?);
        let ctx = AgentContext::new(completion, tools, config, events);
        Ok(Self {
            state_manager: Arc::new(StateManager::new()),
            graph,
            ctx,
        })
    }

    /// Serves one user turn end to end.
    ///
    /// Same-user turns are serialized by the per-user lock, held across the
    /// whole run to preserve chat append ordering; distinct users proceed
    /// concurrently.
    pub async fn process_user_input(
        &self,
        user_id: &str,
        chat_id: &str,
        message: &str,
    ) -> TurnOutcome {
        let config = &self.ctx.config;
        let user_handle = self.state_manager.user(user_id);
        let mut user = user_handle.lock().await;

        let (history, chat_id) = {
            let chat = user.chat_or_create(chat_id);
            chat.add_message(Role::User, message);
            (
                chat.context_window(config.context_window_tokens, config.chars_per_token),
                chat.id.clone(),
            )
        };

        let state = AgentState::new(user_id, &chat_id, message, history)
            .with_long_term_context(user.long_term().clone());

        info!(user_id, chat_id = %chat_id, "starting workflow run");
        let runner = WorkflowRunner::new(self.graph.clone(), self.ctx.clone());
        let outcome = match runner.run(state).await {
            Ok(final_state) => {
                if let Some(reply) = final_state
                    .response
                    .response
                    .as_deref()
                    .filter(|r| !r.is_empty())
                {
                    if let Some(chat) = user.chat_mut(&chat_id) {
                        chat.add_message(Role::Assistant, reply);
                    }
                }
                user.summarize_chat_if_needed(
                    &chat_id,
                    config.summarize_threshold_tokens,
                    config.chars_per_token,
                );
                TurnOutcome::from_state(final_state)
            }
            Err(err) => {
                error!(error = %err, user_id, chat_id = %chat_id, "workflow run failed");
                TurnOutcome::apology(err.to_string())
            }
        };
        info!(
            user_id,
            agent_used = outcome.agent_used.map(|a| a.as_str()),
            error = outcome.error.as_deref(),
            "workflow run finished"
        );
        outcome
    }

    /// Serves one turn and yields it as stream items: reasoning steps in
    /// executed order, then the final response.
    pub async fn process_message_stream(
        &self,
        user_id: &str,
        chat_id: &str,
        message: &str,
    ) -> futures_util::stream::Iter<std::vec::IntoIter<StreamItem>> {
        let outcome = self.process_user_input(user_id, chat_id, message).await;
        futures_util::stream::iter(items_for_turn(&outcome))
    }

    /// Full message history of one chat, oldest first.
    pub async fn chat_history(&self, user_id: &str, chat_id: &str) -> Vec<Message> {
        let user_handle = self.state_manager.user(user_id);
        let user = user_handle.lock().await;
        user.chat(chat_id)
            .map(|chat| chat.messages().to_vec())
            .unwrap_or_default()
    }

    /// Drops one chat thread. Returns whether it existed.
    pub async fn clear_chat(&self, user_id: &str, chat_id: &str) -> bool {
        let user_handle = self.state_manager.user(user_id);
        let mut user = user_handle.lock().await;
        user.remove_chat(chat_id)
    }

    /// The user's long-term summaries, keyed by chat id.
    pub async fn long_term_history(
        &self,
        user_id: &str,
    ) -> rustc_hash::FxHashMap<String, ChatSummary> {
        let user_handle = self.state_manager.user(user_id);
        let user = user_handle.lock().await;
        user.long_term().summaries.clone()
    }
}

/// Encodes the control policy: who runs after whom, and under what
/// condition.
///
/// | from | condition | to |
/// |---|---|---|
/// | router | route decision | conversation / planning / moderation, else fallback |
/// | planning | always | dispatcher |
/// | dispatcher | plan priority | analysis / summarization / final |
/// | analysis, summarization | always | feedback |
/// | feedback | attempts ≥ bound, or proceed | final; else planning |
/// | conversation, moderation | always | final |
/// | fallback | rerun target known and not itself | that agent, else final |
///
/// The uniform error edge (any failing agent → fallback) lives in the
/// runner, not here.
pub fn build_workflow_graph(config: &Config) -> Result<WorkflowGraph, GraphError> {
    let max_replan_attempts = config.max_replan_attempts;
    GraphBuilder::new(WorkflowNode::Agent(AgentName::Router))
        .add_agent(RouterAgent)
        .add_agent(ConversationAgent)
        .add_agent(PlanningAgent)
        .add_agent(SpecialistAgent::analysis())
        .add_agent(SpecialistAgent::summarization())
        .add_agent(ContentModerationAgent)
        .add_agent(FeedbackAgent)
        .add_agent(FallbackAgent)
        .add_conditional_edge(
            WorkflowNode::Agent(AgentName::Router),
            Arc::new(|state: &AgentState| match state.processing.route_decision {
                Some(target) if AgentName::ROUTABLE.contains(&target) => {
                    WorkflowNode::Agent(target)
                }
                _ => WorkflowNode::Agent(AgentName::Fallback),
            }),
        )
        .add_edge(
            WorkflowNode::Agent(AgentName::Planning),
            WorkflowNode::Dispatcher,
        )
        .add_conditional_edge(
            WorkflowNode::Dispatcher,
            Arc::new(
                |state: &AgentState| match state.processing.plan.dispatch_target() {
                    DispatchTarget::Analysis => WorkflowNode::Agent(AgentName::Analysis),
                    DispatchTarget::Summarization => WorkflowNode::Agent(AgentName::Summarization),
                    DispatchTarget::FinalResponse => WorkflowNode::FinalResponse,
                },
            ),
        )
        .add_edge(
            WorkflowNode::Agent(AgentName::Analysis),
            WorkflowNode::Agent(AgentName::Feedback),
        )
        .add_edge(
            WorkflowNode::Agent(AgentName::Summarization),
            WorkflowNode::Agent(AgentName::Feedback),
        )
        .add_conditional_edge(
            WorkflowNode::Agent(AgentName::Feedback),
            Arc::new(move |state: &AgentState| {
                if state.processing.replan_attempts >= max_replan_attempts {
                    // Forced proceed: the replan loop is bounded regardless
                    // of the verdict.
                    return WorkflowNode::FinalResponse;
                }
                match state.response.metadata.feedback {
                    Some(verdict) if !verdict.proceed => WorkflowNode::Agent(AgentName::Planning),
                    _ => WorkflowNode::FinalResponse,
                }
            }),
        )
        .add_edge(
            WorkflowNode::Agent(AgentName::Conversation),
            WorkflowNode::FinalResponse,
        )
        .add_edge(
            WorkflowNode::Agent(AgentName::ContentModeration),
            WorkflowNode::FinalResponse,
        )
        .add_conditional_edge(
            WorkflowNode::Agent(AgentName::Fallback),
            Arc::new(|state: &AgentState| {
                match state
                    .response
                    .metadata
                    .rerun
                    .as_ref()
                    .and_then(|signal| signal.target())
                {
                    // A fallback that nominates itself would recurse; end
                    // the run instead.
                    Some(AgentName::Fallback) | None => WorkflowNode::FinalResponse,
                    Some(target) => WorkflowNode::Agent(target),
                }
            }),
        )
        .compile()
}
