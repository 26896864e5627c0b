//! Domain event system: progress reporting decoupled from the run loop.
//!
//! The run loop publishes events as a turn moves through its states. The
//! chat shell subscribes to drive its progress indicator; nothing in the loop
//! depends on anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::assistant::RunStatus;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A file was uploaded for the current turn
    AttachmentUploaded {
        file_name: String,
        file_id: String,
        inline_image: bool,
        timestamp: DateTime<Utc>,
    },

    /// A run was started for a turn
    RunStarted {
        run_id: String,
        thread_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A poll observed a status different from the previous one
    RunStatusChanged {
        run_id: String,
        status: RunStatus,
        timestamp: DateTime<Utc>,
    },

    /// A local tool answered a call from the assistant
    ToolDispatched {
        tool_name: String,
        arguments: serde_json::Value,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The run reached a terminal state (or was aborted)
    RunFinished {
        run_id: String,
        status: RunStatus,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolDispatched {
            tool_name: "current_weather".into(),
            arguments: serde_json::json!({"location": "Seoul"}),
            success: true,
            duration_ms: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolDispatched { tool_name, success, .. } => {
                assert_eq!(tool_name, "current_weather");
                assert!(*success);
            }
            _ => panic!("Expected ToolDispatched event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::RunFinished {
            run_id: "run_1".into(),
            status: RunStatus::Completed,
            timestamp: Utc::now(),
        });
    }
}
