//! Telemetry - fire-and-forget observation of scheduler activity.
//!
//! The sink is synchronous and must never block a tick. The broadcast
//! implementation fans events out to live subscribers and treats "no
//! receivers" as success; nothing in the control path depends on anyone
//! listening.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::action::ActionId;

/// One scheduler or mechanism observation.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    /// Phase label, e.g. action_started/action_finished/action_interrupted/
    /// action_rejected/driver_fault/measurement.
    pub phase: String,
    /// Run this event belongs to, when applicable.
    pub run_id: Option<ActionId>,
    /// Action name, when applicable.
    pub action: Option<String>,
    /// Optional human-readable message.
    pub message: Option<String>,
    /// Extra structured metadata (commanded vectors, positions, ...).
    pub metadata: Value,
    /// Wall-clock time the event was recorded.
    pub at: DateTime<Utc>,
}

impl TelemetryEvent {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            run_id: None,
            action: None,
            message: None,
            metadata: Value::Null,
            at: Utc::now(),
        }
    }

    pub fn with_run_id(mut self, run_id: ActionId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Sink interface for telemetry events. `record` must not block.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// In-process telemetry fan-out based on tokio broadcast channels.
pub struct BroadcastTelemetry {
    tx: broadcast::Sender<TelemetryEvent>,
    capacity: usize,
}

impl BroadcastTelemetry {
    /// Create a new broadcast sink with channel capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Return the configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    /// Convenience for handing the sink to a scheduler.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for BroadcastTelemetry {
    fn default() -> Self {
        // Enough headroom for slow log consumers at a 50 Hz tick rate.
        Self::new(1024)
    }
}

impl TelemetrySink for BroadcastTelemetry {
    fn record(&self, event: TelemetryEvent) {
        // Absent receivers are not an error; the control loop never cares.
        let _ = self.tx.send(event);
    }
}
