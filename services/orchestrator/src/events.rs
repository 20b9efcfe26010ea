//! Lifecycle and progress events
//!
//! Published on a bounded broadcast channel. Publishing never blocks and never
//! fails the operation that produced the event; slow subscribers lag and
//! lose the oldest events.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Something that happened inside the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Adapter added to the registry
    AdapterRegistered {
        provider: String,
        enabled: bool,
    },
    /// Every enabled adapter initialized
    AdaptersInitialized {
        providers: Vec<String>,
    },
    /// Transform returned a result
    TransformCompleted {
        transformation_id: Uuid,
        provider: String,
        attempts: u32,
        entities: usize,
        metrics: usize,
        relationships: usize,
        /// Validation outcome, `None` when validation is off
        valid: Option<bool>,
        duration_ms: u64,
    },
    /// Transform failed after its final attempt
    TransformFailed {
        transformation_id: Uuid,
        provider: String,
        attempts: u32,
        error: String,
    },
    /// Attempt failed, another one is scheduled
    RetryScheduled {
        transformation_id: Uuid,
        provider: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    /// Result sink rejected a result; the transform itself still succeeded
    SinkFailed {
        transformation_id: Uuid,
        provider: String,
        error: String,
    },
    /// Shutdown finished
    ShutdownCompleted {
        /// Transforms still running when the timeout elapsed
        remaining_transformations: usize,
    },
}

/// Sending half of the event channel
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    /// Fire and forget; an event with no subscriber is simply dropped
    pub fn publish(&self, event: OrchestratorEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(?event, "No event subscribers");
        }
    }
}
