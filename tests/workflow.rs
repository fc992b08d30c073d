//! End-to-end workflow runs and routing policy checks.

mod common;

use std::sync::Arc;

use colloquy::agent::{Agent, AgentName};
use colloquy::agents::{FallbackAgent, SpecialistAgent};
use colloquy::config::Config;
use colloquy::executor::RAG_TOOL;
use colloquy::graph::WorkflowNode;
use colloquy::orchestrator::build_workflow_graph;
use colloquy::plan::{Plan, PlanStep, ToolCall};
use colloquy::state::{AgentState, FeedbackVerdict};
use serde_json::json;

use common::*;

fn agent_node(name: AgentName) -> WorkflowNode {
    WorkflowNode::Agent(name)
}

#[tokio::test]
async fn greeting_routes_to_conversation_agent() {
    let completion = ScriptedCompletion::new([
        route_json("conversation_agent"),
        "Hi! How can I help you today?".to_string(),
    ]);
    let engine = engine(completion.clone());

    let outcome = engine.process_user_input("u1", "c1", "Hello").await;

    assert_eq!(outcome.agent_used, Some(AgentName::Conversation));
    assert_eq!(outcome.route_decision, Some(AgentName::Conversation));
    assert!(outcome.error.is_none());
    assert_eq!(outcome.response.as_deref(), Some("Hi! How can I help you today?"));
    assert_eq!(
        outcome.metadata.executed_steps,
        vec![AgentName::Router, AgentName::Conversation]
    );
    let stamp = outcome.metadata.response.completed.expect("stamped");
    assert!(stamp.workflow_completed);
    assert_eq!(completion.remaining(), 0);
}

#[tokio::test]
async fn empty_input_short_circuits_to_fallback() {
    // The router never calls the completion on empty input; the two
    // scripted replies feed the two bounded fallback passes.
    let completion = ScriptedCompletion::new([
        fallback_json("router_agent", "ask the user to type a message"),
        fallback_json("router_agent", "ask the user to type a message"),
    ]);
    let engine = engine(completion.clone());

    let outcome = engine.process_user_input("u1", "c1", "").await;

    assert_eq!(outcome.route_decision, Some(AgentName::Fallback));
    assert_eq!(outcome.error.as_deref(), Some("No user input provided"));
    assert!(outcome.response.is_some());
    assert!(outcome.metadata.response.completed.is_some());
    assert_eq!(completion.remaining(), 0);
}

#[tokio::test]
async fn planned_analysis_runs_tools_and_synthesizes() {
    let completion = ScriptedCompletion::new([
        route_json("planning_agent"),
        plan_json("analysis_agent", RAG_TOOL, "thesis projects"),
        "The projects cover retrieval and evaluation.".to_string(),
        feedback_json(true),
    ]);
    let engine = engine(completion.clone());

    let outcome = engine
        .process_user_input("u1", "c1", "Compare the thesis projects")
        .await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.agent_used, Some(AgentName::Feedback));
    assert_eq!(
        outcome.metadata.executed_steps,
        vec![
            AgentName::Router,
            AgentName::Planning,
            AgentName::Analysis,
            AgentName::Feedback
        ]
    );
    assert_eq!(outcome.metadata.tool_responses.len(), 1);
    assert!(
        outcome.metadata.tool_responses[0]
            .response
            .contains("thesis projects overview")
    );
    assert_eq!(
        outcome.response.as_deref(),
        Some("The projects cover retrieval and evaluation.")
    );
    assert_eq!(completion.remaining(), 0);
}

#[tokio::test]
async fn rejected_feedback_replans_once_then_proceeds() {
    let completion = ScriptedCompletion::new([
        route_json("planning_agent"),
        plan_json("summarization_agent", RAG_TOOL, "summarize"),
        "First draft summary.".to_string(),
        feedback_json(false),
        plan_json("summarization_agent", RAG_TOOL, "summarize better"),
        "Improved summary.".to_string(),
        feedback_json(true),
    ]);
    let engine = engine(completion.clone());

    let outcome = engine
        .process_user_input("u1", "c1", "Summarize the documents")
        .await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.response.as_deref(), Some("Improved summary."));
    let planning_passes = outcome
        .metadata
        .executed_steps
        .iter()
        .filter(|step| **step == AgentName::Planning)
        .count();
    assert_eq!(planning_passes, 2);
    assert_eq!(completion.remaining(), 0);
}

#[test]
fn feedback_edge_forces_proceed_at_replan_bound() {
    let config = Config::default();
    let graph = build_workflow_graph(&config).unwrap();
    let mut state = AgentState::new("u1", "c1", "question", Vec::new());

    // At the bound, even an explicit replan verdict is overridden.
    state.processing.replan_attempts = config.max_replan_attempts;
    state.response.metadata.feedback = Some(FeedbackVerdict { proceed: false });
    assert_eq!(
        graph.next(agent_node(AgentName::Feedback), &state).unwrap(),
        WorkflowNode::FinalResponse
    );

    // Under the bound the verdict decides.
    state.processing.replan_attempts = 0;
    assert_eq!(
        graph.next(agent_node(AgentName::Feedback), &state).unwrap(),
        agent_node(AgentName::Planning)
    );
    state.response.metadata.feedback = Some(FeedbackVerdict { proceed: true });
    assert_eq!(
        graph.next(agent_node(AgentName::Feedback), &state).unwrap(),
        WorkflowNode::FinalResponse
    );
}

#[test]
fn dispatcher_edge_follows_plan_priority() {
    let graph = build_workflow_graph(&Config::default()).unwrap();
    let mut state = AgentState::new("u1", "c1", "question", Vec::new());

    let step = |agent| PlanStep {
        agent,
        tools: vec![ToolCall::new(RAG_TOOL).with_arg("query", json!("q"))],
    };

    state.processing.plan = Plan(vec![step(AgentName::Summarization), step(AgentName::Analysis)]);
    assert_eq!(
        graph.next(WorkflowNode::Dispatcher, &state).unwrap(),
        agent_node(AgentName::Analysis)
    );

    state.processing.plan = Plan(vec![step(AgentName::Summarization)]);
    assert_eq!(
        graph.next(WorkflowNode::Dispatcher, &state).unwrap(),
        agent_node(AgentName::Summarization)
    );

    state.processing.plan = Plan::default();
    assert_eq!(
        graph.next(WorkflowNode::Dispatcher, &state).unwrap(),
        WorkflowNode::FinalResponse
    );
}

#[tokio::test]
async fn fallback_round_trip_reruns_failed_agent_without_resurfacing_error() {
    let graph = build_workflow_graph(&Config::default()).unwrap();
    let mut state = AgentState::new("u1", "c1", "compare the projects", Vec::new());
    state.processing.plan = Plan(vec![PlanStep {
        agent: AgentName::Analysis,
        tools: vec![ToolCall::new(RAG_TOOL).with_arg("query", json!("projects"))],
    }]);
    state.fail(AgentName::Analysis, "Analysis error: provider timeout");

    // Fallback turns the error into a rerun signal.
    let ctx = test_ctx(ScriptedCompletion::new([fallback_json(
        "analysis_agent",
        "narrow the query",
    )]));
    FallbackAgent.run(&mut state, &ctx).await;
    let rerun = state.response.metadata.rerun.clone().expect("rerun signal");
    assert_eq!(rerun.agent, "analysis_agent");
    assert!(!rerun.solution.is_empty());
    assert_eq!(
        graph.next(agent_node(AgentName::Fallback), &state).unwrap(),
        agent_node(AgentName::Analysis)
    );

    // The rerun consumes the solution and clears the stale error.
    let ctx = test_ctx(ScriptedCompletion::new(["A cleaner comparison."]));
    SpecialistAgent::analysis().run(&mut state, &ctx).await;
    assert!(state.error.error.is_none());
    assert_eq!(state.response.response.as_deref(), Some("A cleaner comparison."));
    assert_eq!(state.processing.current_agent, Some(AgentName::Analysis));
}

#[tokio::test]
async fn unknown_rerun_target_ends_the_run() {
    let completion = ScriptedCompletion::new([
        "this is not a json object".to_string(),
        fallback_json("grand_vizier_agent", "consult the vizier"),
    ]);
    let engine = engine(completion.clone());

    let outcome = engine.process_user_input("u1", "c1", "Hello").await;

    assert_eq!(outcome.agent_used, Some(AgentName::Fallback));
    assert!(outcome.metadata.response.completed.is_some());
    assert_eq!(
        outcome.metadata.response.rerun.as_ref().map(|r| r.agent.as_str()),
        Some("grand_vizier_agent")
    );
    assert_eq!(completion.remaining(), 0);
}

#[tokio::test]
async fn total_provider_outage_degrades_to_apology() {
    let engine = engine(Arc::new(FailingCompletion));

    let outcome = engine.process_user_input("u1", "c1", "Hello").await;

    // Router fails, then fallback itself fails; the run still terminates
    // with a stamped final response and a user-visible apology.
    assert_eq!(outcome.agent_used, Some(AgentName::Fallback));
    assert!(outcome.error.as_deref().unwrap().starts_with("Fallback agent error:"));
    let response = outcome.response.expect("apology response");
    assert!(!response.contains("error:"));
    assert!(outcome.metadata.response.completed.is_some());
}

#[tokio::test]
async fn moderation_route_produces_supportive_reply() {
    let completion = ScriptedCompletion::new([
        route_json("content_moderation_agent"),
        "You're not alone; please consider reaching out to someone you trust.".to_string(),
    ]);
    let engine = engine(completion);

    let outcome = engine.process_user_input("u1", "c1", "I feel hopeless").await;

    assert_eq!(outcome.agent_used, Some(AgentName::ContentModeration));
    assert!(outcome.error.is_none());
    assert!(outcome.response.unwrap().contains("not alone"));
}

#[tokio::test]
async fn chat_history_persists_across_turns() {
    let completion = ScriptedCompletion::new([
        route_json("conversation_agent"),
        "Hello!".to_string(),
        route_json("conversation_agent"),
        "Still here.".to_string(),
    ]);
    let engine = engine(completion);

    engine.process_user_input("u1", "c1", "Hi").await;
    engine.process_user_input("u1", "c1", "Are you there?").await;

    let history = engine.chat_history("u1", "c1").await;
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Hi", "Hello!", "Are you there?", "Still here."]);

    assert!(engine.clear_chat("u1", "c1").await);
    assert!(engine.chat_history("u1", "c1").await.is_empty());
}

#[tokio::test]
async fn long_conversations_are_archived_once() {
    let completion = ScriptedCompletion::new([
        route_json("conversation_agent"),
        "x".repeat(50),
        route_json("conversation_agent"),
        "y".repeat(50),
    ]);
    // Threshold of 10 tokens * 4 chars: the first exchange crosses it.
    let config = Config::default().with_summarize_threshold_tokens(10);
    let engine = engine_with_config(completion, config);

    engine.process_user_input("u1", "c1", "tell me something long").await;
    engine.process_user_input("u1", "c1", "and again").await;

    let summaries = engine.long_term_history("u1").await;
    assert_eq!(summaries.len(), 1);
    assert!(summaries.contains_key("c1"));
}
