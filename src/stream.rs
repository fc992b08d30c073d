//! Line-delimited JSON items for the streaming ingress.
//!
//! A turn streams as zero or more `reasoning` items (one per executed agent,
//! in order, the last enriched with routing detail), followed by exactly one
//! `final` item. Stream-level failures surface as a single `error` item.
//! The HTTP layer serializes each item onto its own line; see
//! `demos/serve.rs`.

use serde::Serialize;

use crate::agent::AgentName;
use crate::orchestrator::TurnOutcome;

/// One element of the streamed turn.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamItem {
    Reasoning {
        step: AgentName,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        route_decision: Option<AgentName>,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_used: Option<AgentName>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence_score: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Final {
        response: String,
    },
    Error {
        error: String,
    },
}

/// Expands a finished turn into its stream items.
///
/// Per-step responses come from the ordered tool responses where available;
/// the last executed step carries the main response. The trailing reasoning
/// item repeats the routing detail for clients that only render the tail.
#[must_use]
pub fn items_for_turn(outcome: &TurnOutcome) -> Vec<StreamItem> {
    let mut items = Vec::new();
    let steps: Vec<AgentName> = if outcome.metadata.executed_steps.is_empty() {
        outcome.agent_used.into_iter().collect()
    } else {
        outcome.metadata.executed_steps.clone()
    };

    for (idx, step) in steps.iter().enumerate() {
        let mut response = outcome
            .metadata
            .tool_responses
            .get(idx)
            .map(|tool| tool.response.clone());
        if response.is_none() && idx == steps.len() - 1 {
            response = outcome.response.clone();
        }
        items.push(StreamItem::Reasoning {
            step: *step,
            status: Some("executed"),
            response,
            route_decision: None,
            agent_used: None,
            confidence_score: None,
            metadata: None,
            error: None,
        });
    }

    if let Some(agent_used) = outcome.agent_used {
        items.push(StreamItem::Reasoning {
            step: agent_used,
            status: None,
            response: None,
            route_decision: outcome.route_decision,
            agent_used: Some(agent_used),
            confidence_score: outcome.confidence_score,
            metadata: serde_json::to_value(&outcome.metadata).ok(),
            error: outcome.error.clone(),
        });
    }

    items.push(StreamItem::Final {
        response: outcome
            .response
            .clone()
            .unwrap_or_else(|| "(No response)".to_string()),
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::TurnMetadata;

    fn outcome() -> TurnOutcome {
        TurnOutcome {
            response: Some("hello there".to_string()),
            agent_used: Some(AgentName::Conversation),
            route_decision: Some(AgentName::Conversation),
            confidence_score: Some(0.9),
            metadata: TurnMetadata {
                executed_steps: vec![AgentName::Router, AgentName::Conversation],
                ..TurnMetadata::default()
            },
            error: None,
        }
    }

    #[test]
    fn items_end_with_exactly_one_final() {
        let items = items_for_turn(&outcome());
        assert!(matches!(items.last(), Some(StreamItem::Final { .. })));
        let finals = items
            .iter()
            .filter(|i| matches!(i, StreamItem::Final { .. }))
            .count();
        assert_eq!(finals, 1);
    }

    #[test]
    fn last_executed_step_carries_main_response() {
        let items = items_for_turn(&outcome());
        match &items[1] {
            StreamItem::Reasoning { step, response, .. } => {
                assert_eq!(*step, AgentName::Conversation);
                assert_eq!(response.as_deref(), Some("hello there"));
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn serialized_items_are_tagged() {
        let items = items_for_turn(&outcome());
        let line = serde_json::to_string(&items[0]).unwrap();
        assert!(line.contains("\"type\":\"reasoning\""));
        assert!(line.contains("\"step\":\"router_agent\""));
        let line = serde_json::to_string(items.last().unwrap()).unwrap();
        assert!(line.contains("\"type\":\"final\""));
    }

    #[test]
    fn empty_turn_still_yields_final() {
        let empty = TurnOutcome {
            response: None,
            agent_used: None,
            route_decision: None,
            confidence_score: None,
            metadata: TurnMetadata::default(),
            error: Some("boom".to_string()),
        };
        let items = items_for_turn(&empty);
        assert_eq!(items.len(), 1);
        match &items[0] {
            StreamItem::Final { response } => assert_eq!(response, "(No response)"),
            other => panic!("unexpected item: {other:?}"),
        }
    }
}
