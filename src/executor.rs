//! Tool dispatch: executes a list of planned tool calls against a fixed
//! registry.
//!
//! Execution is strictly sequential in plan order. Unknown tool names are
//! skipped with a warning; a failing tool degrades to a per-tool
//! `"Error: ..."` response string and never aborts the remaining calls or
//! touches the run-level error state.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::plan::ToolCall;
use crate::providers::{
    DocumentRetriever, RetrievalError, RetrievedDocument, SearchError, WebSearchProvider,
};
use crate::state::{AgentState, ToolResponse};

/// Wire name of the document-retrieval tool.
pub const RAG_TOOL: &str = "rag_tool";
/// Wire name of the web-search tool.
pub const WEB_SEARCH_TOOL: &str = "web_search_tool";

/// Failures internal to a tool invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error(transparent)]
    #[diagnostic(code(colloquy::executor::retrieval))]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    #[diagnostic(code(colloquy::executor::search))]
    Search(#[from] SearchError),
}

/// An executable tool. Tools receive the shared state (some write retrieval
/// results or a response into it) plus their own call arguments, and may
/// return a direct response string.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn invoke(
        &self,
        state: &mut AgentState,
        call: &ToolCall,
    ) -> Result<Option<String>, ToolError>;
}

/// Fixed mapping from tool name to implementation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(mut self, name: impl Into<String>, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(name.into(), tool);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// The standard registry: document retrieval plus web search.
    #[must_use]
    pub fn standard(
        retriever: Arc<dyn DocumentRetriever>,
        search: Arc<dyn WebSearchProvider>,
        web_search_max_results: usize,
    ) -> Self {
        Self::new()
            .register(RAG_TOOL, Arc::new(RagTool { retriever }))
            .register(
                WEB_SEARCH_TOOL,
                Arc::new(WebSearchTool {
                    search,
                    default_max_results: web_search_max_results,
                }),
            )
    }
}

/// Executes `calls` in order, appending one [`ToolResponse`] per attempted
/// call to the state's `tool_responses` list.
///
/// Per-call response preference: a response the tool wrote into the response
/// channel during the call, else the tool's returned value, else
/// `"Error: <message>"`. Partial failure of one tool never aborts the rest.
pub async fn execute_tool_calls(registry: &ToolRegistry, state: &mut AgentState, calls: &[ToolCall]) {
    let mut responses = Vec::with_capacity(calls.len());
    for call in calls {
        let Some(tool) = registry.get(&call.tool) else {
            tracing::warn!(tool = %call.tool, "unknown tool in plan, skipping");
            continue;
        };
        state.processing.last_tool = Some(call.tool.clone());
        let before = state.response.response.clone();
        let response = match tool.invoke(state, call).await {
            Ok(returned) => {
                let written = state
                    .response
                    .response
                    .clone()
                    .filter(|after| Some(after) != before.as_ref());
                written
                    .or(returned)
                    .unwrap_or_else(|| "No response from the tool.".to_string())
            }
            Err(err) => {
                tracing::error!(tool = %call.tool, error = %err, "tool invocation failed");
                format!("Error: {err}")
            }
        };
        responses.push(ToolResponse {
            tool: call.tool.clone(),
            args: call.args.clone(),
            response,
        });
    }
    state.response.tool_responses = responses;
}

/// Document retrieval against the ingested corpus.
///
/// Stores the ranked documents (at most 5) in the retrieval state under the
/// chat id, and returns them formatted as the tool response.
struct RagTool {
    retriever: Arc<dyn DocumentRetriever>,
}

#[async_trait]
impl Tool for RagTool {
    async fn invoke(
        &self,
        state: &mut AgentState,
        call: &ToolCall,
    ) -> Result<Option<String>, ToolError> {
        let query = call
            .query()
            .unwrap_or(state.processing.user_input.as_str())
            .to_string();
        let mut documents = self.retriever.retrieve(&query).await?;
        documents.truncate(5);
        tracing::info!(count = documents.len(), "retrieved documents");
        let formatted = format_documents(&documents);
        state
            .retrieval
            .retrieved
            .entry(state.chat_id.clone())
            .or_default()
            .extend(documents);
        Ok(Some(formatted))
    }
}

fn format_documents(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return "No matching documents found.".to_string();
    }
    documents
        .iter()
        .map(|doc| match &doc.source {
            Some(source) => format!("{} [{}]", doc.content, source),
            None => doc.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Web search via the configured provider.
struct WebSearchTool {
    search: Arc<dyn WebSearchProvider>,
    default_max_results: usize,
}

#[async_trait]
impl Tool for WebSearchTool {
    async fn invoke(
        &self,
        state: &mut AgentState,
        call: &ToolCall,
    ) -> Result<Option<String>, ToolError> {
        let query = call
            .query()
            .unwrap_or(state.processing.user_input.as_str())
            .trim()
            .to_string();
        if query.is_empty() {
            // Provider contract: empty query yields no results, not an error.
            return Ok(Some(String::new()));
        }
        let max_results = call
            .args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .filter(|v| *v > 0)
            .unwrap_or(self.default_max_results);
        let snippets = self.search.search(&query, max_results).await?;
        tracing::info!(count = snippets.len(), %query, "web search results");
        Ok(Some(snippets.join("\n\n")))
    }
}
