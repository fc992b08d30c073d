//! Chat ingress demo: a single POST endpoint streaming line-delimited JSON.
//!
//! Each request runs one workflow turn and streams its reasoning steps
//! followed by the final response, one JSON object per line.
//!
//! Run with:
//!   GROQ_API_KEY=... cargo run --example serve --features groq
//!
//! Then, in another terminal:
//!   curl -N -X POST http://127.0.0.1:8000/api/v1/chat \
//!     -H 'content-type: application/json' \
//!     -d '{"user_id": "u1", "message": "Hello"}'

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::net::TcpListener;

use colloquy::config::Config;
use colloquy::groq::GroqCompletion;
use colloquy::orchestrator::Orchestrator;
use colloquy::providers::{
    DocumentRetriever, RetrievalError, RetrievedDocument, SearchError, WebSearchProvider,
};
use colloquy::stream::StreamItem;
use colloquy::telemetry;

/// Demo corpus standing in for a real vector store.
struct StaticRetriever;

#[async_trait]
impl DocumentRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        Ok(vec![
            RetrievedDocument::new(
                "Thesis project A explores retrieval-augmented generation for \
                 institutional archives.",
            ),
            RetrievedDocument::new(
                "Thesis project B evaluates feedback-driven replanning in \
                 multi-agent assistants.",
            ),
        ])
    }
}

/// Demo search provider; a real deployment would call a search API here.
struct StubSearch;

#[async_trait]
impl WebSearchProvider for StubSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![format!("(demo) no live search configured for: {query}")]
            .into_iter()
            .take(max_results)
            .collect())
    }
}

#[derive(Deserialize)]
struct UserRequest {
    user_id: String,
    message: String,
}

async fn chat(
    State(engine): State<Arc<Orchestrator>>,
    Json(request): Json<UserRequest>,
) -> impl IntoResponse {
    let chat_id = format!("{}_default", request.user_id);
    let items = engine
        .process_message_stream(&request.user_id, &chat_id, &request.message)
        .await;
    let lines = items.map(|item| {
        let line = serde_json::to_string(&item).unwrap_or_else(|err| {
            serde_json::to_string(&StreamItem::Error {
                error: err.to_string(),
            })
            .expect("error item serializes")
        });
        Ok::<_, Infallible>(line + "\n")
    });
    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(lines),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let completion = Arc::new(GroqCompletion::from_env()?);
    let engine = Orchestrator::new(
        completion,
        Arc::new(StaticRetriever),
        Arc::new(StubSearch),
        Config::from_env(),
    )?;

    let router = Router::new()
        .route("/api/v1/chat", post(chat))
        .with_state(Arc::new(engine));

    let addr: SocketAddr = "127.0.0.1:8000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("serving chat ingress on http://{addr}/api/v1/chat");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
