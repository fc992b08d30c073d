#![allow(dead_code)]

//! Shared fixtures: scripted providers and context builders.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use colloquy::agent::AgentContext;
use colloquy::config::Config;
use colloquy::events::EventSender;
use colloquy::executor::ToolRegistry;
use colloquy::orchestrator::Orchestrator;
use colloquy::providers::{
    CompletionError, CompletionProvider, CompletionRequest, DocumentRetriever, RetrievalError,
    RetrievedDocument, SearchError, WebSearchProvider,
};

/// Completion provider that replays a fixed script of replies in order.
/// Running past the end of the script is a provider error, which doubles as
/// a guard against unexpected extra completion calls.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        })
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CompletionError::Provider {
                provider: "scripted",
                message: "script exhausted".to_string(),
            })
    }
}

/// Completion provider that always fails.
pub struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Provider {
            provider: "failing",
            message: "completion unavailable".to_string(),
        })
    }
}

/// Retriever returning a fixed document list.
#[derive(Default)]
pub struct FakeRetriever {
    pub docs: Vec<RetrievedDocument>,
}

impl FakeRetriever {
    pub fn with_docs<I, S>(contents: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            docs: contents
                .into_iter()
                .map(|c| RetrievedDocument::new(c))
                .collect(),
        })
    }
}

#[async_trait]
impl DocumentRetriever for FakeRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        Ok(self.docs.clone())
    }
}

/// Search provider returning fixed snippets.
#[derive(Default)]
pub struct FakeSearch {
    pub snippets: Vec<String>,
}

#[async_trait]
impl WebSearchProvider for FakeSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.snippets.iter().take(max_results).cloned().collect())
    }
}

/// Route decision reply for the router completion.
pub fn route_json(agent: &str) -> String {
    format!(
        r#"{{"agent": "{agent}", "confidence": 0.9, "reasoning": "scripted",
            "requires_context": false, "is_greeting": true}}"#
    )
}

/// Single-step plan reply for the planning completion.
pub fn plan_json(agent: &str, tool: &str, query: &str) -> String {
    format!(
        r#"{{"plan": [{{"agent": "{agent}", "tools": [{{"tool": "{tool}", "args": {{"query": "{query}"}}}}]}}]}}"#
    )
}

pub fn feedback_json(proceed: bool) -> String {
    format!(r#"{{"proceed": {proceed}}}"#)
}

pub fn fallback_json(rerun_agent: &str, solution: &str) -> String {
    format!(r#"{{"rerun_agent": "{rerun_agent}", "solution": "{solution}"}}"#)
}

/// Context for driving agents directly, outside the orchestrator.
pub fn test_ctx(completion: Arc<dyn CompletionProvider>) -> AgentContext {
    let registry = ToolRegistry::standard(
        FakeRetriever::with_docs(["thesis projects overview", "research methods survey"]),
        Arc::new(FakeSearch::default()),
        10,
    );
    AgentContext::new(
        completion,
        Arc::new(registry),
        Config::default(),
        EventSender::disabled(),
    )
}

/// Fully wired engine with fake retrieval/search collaborators.
pub fn engine(completion: Arc<dyn CompletionProvider>) -> Orchestrator {
    engine_with_config(completion, Config::default())
}

pub fn engine_with_config(completion: Arc<dyn CompletionProvider>, config: Config) -> Orchestrator {
    Orchestrator::new(
        completion,
        FakeRetriever::with_docs(["thesis projects overview", "research methods survey"]),
        Arc::new(FakeSearch::default()),
        config,
    )
    .expect("workflow graph compiles")
}
