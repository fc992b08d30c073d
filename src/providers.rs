//! External collaborator interfaces: completion, document retrieval, web
//! search.
//!
//! The engine treats all three as opaque async calls behind narrow traits.
//! Retries, backoff and ranking internals belong to implementations, never
//! to the core. A reqwest-backed completion client lives in [`crate::groq`]
//! behind the `groq` feature; tests supply scripted fakes.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

/// A fully constructed prompt: system instructions, prior conversation, and
/// the current user turn.
#[derive(Clone, Debug, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub history: Vec<Message>,
    pub user: String,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            history: Vec::new(),
            user: user.into(),
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: &[Message]) -> Self {
        self.history = history.to_vec();
        self
    }
}

/// Errors surfaced by completion providers.
#[derive(Debug, Error, Diagnostic)]
pub enum CompletionError {
    /// Transport or remote-service failure.
    #[error("completion provider error ({provider}): {message}")]
    #[diagnostic(code(colloquy::providers::completion))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The reply could not be parsed into the requested structure.
    #[error("unparseable completion reply: {reason}")]
    #[diagnostic(
        code(colloquy::providers::unparseable_reply),
        help("The model was asked for a bare JSON object; check the prompt constraints.")
    )]
    UnparseableReply { reason: String },
}

/// Language-model completion calls.
///
/// The contract is text-or-JSON: `complete` returns raw text, and
/// [`complete_structured`] layers JSON parsing on top for the small
/// structured schemas (route decision, plan, fallback solution, feedback
/// verdict).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Runs a completion and parses the reply as a JSON value of type `T`.
///
/// Models occasionally wrap JSON replies in markdown code fences or preamble
/// text; [`extract_json`] tolerates both before handing to serde.
pub async fn complete_structured<T: DeserializeOwned>(
    provider: &dyn CompletionProvider,
    request: CompletionRequest,
) -> Result<T, CompletionError> {
    let reply = provider.complete(request).await?;
    let payload = extract_json(&reply).ok_or_else(|| CompletionError::UnparseableReply {
        reason: "no JSON object found in reply".to_string(),
    })?;
    serde_json::from_str(payload).map_err(|err| CompletionError::UnparseableReply {
        reason: err.to_string(),
    })
}

/// Extracts the first top-level JSON object from a model reply, stripping
/// markdown code fences when present.
#[must_use]
pub fn extract_json(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed)
        .trim();
    let start = body.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in body[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// A retrieved document, ordered by relevance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub source: Option<String>,
}

impl RetrievedDocument {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("document retrieval failed: {message}")]
#[diagnostic(code(colloquy::providers::retrieval))]
pub struct RetrievalError {
    pub message: String,
}

/// Ranked document retrieval over the ingested corpus.
///
/// Implementations return an ordered list of up to 5 documents; the engine
/// consumes the order and never the ranking internals.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrievalError>;
}

#[derive(Debug, Error, Diagnostic)]
#[error("web search failed: {message}")]
#[diagnostic(code(colloquy::providers::web_search))]
pub struct SearchError {
    pub message: String,
}

/// Web search returning formatted text snippets in rank order.
///
/// An empty or whitespace-only query yields an empty list rather than an
/// error; implementations uphold that contract.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError>;
}
