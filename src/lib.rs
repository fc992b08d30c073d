//! # Colloquy: multi-agent conversational assistant engine
//!
//! Colloquy routes each user turn through a directed graph of specialized
//! agents (routing, planning, retrieval-augmented analysis, summarization,
//! conversation, content moderation, feedback-driven replanning and error
//! fallback) while retaining per-user, per-chat conversational state across
//! turns.
//!
//! ## Core concepts
//!
//! - **Agents** ([`agent`], [`agents`]): async nodes consuming and producing
//!   the shared per-turn state, one completion call each. Faults never cross
//!   an agent boundary; they are recorded on the state and recovered through
//!   the fallback agent.
//! - **State** ([`state`], [`store`]): one [`state::AgentState`] flows
//!   through a run and is mutated in place; the [`store::StateManager`]
//!   keeps per-user chats and long-term summaries alive across turns.
//! - **Graph** ([`graph`]): the control policy as nodes plus conditional
//!   edges, with bounded replan and fallback loops enforced by the runner.
//! - **Executor** ([`executor`]): sequential tool dispatch over a fixed
//!   registry, degrading per-tool failures without aborting the plan.
//! - **Providers** ([`providers`]): completion, document retrieval and web
//!   search behind narrow async traits; the engine never sees their
//!   internals.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use colloquy::config::Config;
//! use colloquy::orchestrator::Orchestrator;
//! use colloquy::providers::{
//!     CompletionError, CompletionProvider, CompletionRequest, DocumentRetriever,
//!     RetrievalError, RetrievedDocument, SearchError, WebSearchProvider,
//! };
//!
//! struct CannedCompletion;
//!
//! #[async_trait]
//! impl CompletionProvider for CannedCompletion {
//!     async fn complete(&self, _req: CompletionRequest) -> Result<String, CompletionError> {
//!         Ok(r#"{"agent": "conversation_agent", "confidence": 1.0}"#.to_string())
//!     }
//! }
//!
//! struct NoDocs;
//!
//! #[async_trait]
//! impl DocumentRetriever for NoDocs {
//!     async fn retrieve(&self, _q: &str) -> Result<Vec<RetrievedDocument>, RetrievalError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! struct NoSearch;
//!
//! #[async_trait]
//! impl WebSearchProvider for NoSearch {
//!     async fn search(&self, _q: &str, _n: usize) -> Result<Vec<String>, SearchError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Orchestrator::new(
//!     Arc::new(CannedCompletion),
//!     Arc::new(NoDocs),
//!     Arc::new(NoSearch),
//!     Config::default(),
//! )?;
//! let outcome = engine.process_user_input("u1", "chat-1", "Hello!").await;
//! println!("{:?}", outcome.response);
//! # Ok(())
//! # }
//! ```
//!
//! With the `groq` feature enabled, [`groq::GroqCompletion`] provides a real
//! completion client for any OpenAI-compatible endpoint.

pub mod agent;
pub mod agents;
pub mod config;
pub mod events;
pub mod executor;
pub mod graph;
#[cfg(feature = "groq")]
pub mod groq;
pub mod message;
pub mod orchestrator;
pub mod plan;
pub mod providers;
pub mod state;
pub mod store;
pub mod stream;
pub mod telemetry;
