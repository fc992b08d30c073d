//! Lightweight run-event channel for observability.
//!
//! The workflow runner and agents emit [`RunEvent`]s through a flume channel
//! so callers (the streaming ingress, tests, dashboards) can watch a run
//! without touching the state object. Emission is fire-and-forget: a closed
//! or absent channel never affects workflow execution.

use chrono::{DateTime, Utc};

/// A single observability event from a workflow run.
#[derive(Clone, Debug)]
pub struct RunEvent {
    /// Scope label, conventionally the node or subsystem name.
    pub scope: String,
    pub message: String,
    pub when: DateTime<Utc>,
}

impl RunEvent {
    #[must_use]
    pub fn new(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }
}

/// Sending half of the run-event channel.
///
/// Cloneable and cheap; [`EventSender::disabled`] produces a sender that
/// drops everything, for callers that do not care about events.
#[derive(Clone)]
pub struct EventSender {
    tx: Option<flume::Sender<RunEvent>>,
}

impl EventSender {
    /// Creates a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, flume::Receiver<RunEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender with no channel attached; every emit is a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emits an event, silently dropping it if no receiver is listening.
    pub fn emit(&self, scope: impl Into<String>, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(RunEvent::new(scope, message));
        }
    }
}
