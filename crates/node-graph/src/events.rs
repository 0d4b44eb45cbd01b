//! Event types for observing graph mutations
//!
//! Events are sent from the graph to any consumer (an editor, a log, a
//! test) to report structural changes: nodes coming and going, edges
//! created and removed, and edges lost while reconciling ports.

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, PortRef};

/// Trait for receiving graph events
///
/// This abstracts over the transport mechanism (channel, UI callback, log)
/// so the graph can be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: GraphEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted while a graph is mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    /// A node was added to the graph
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId, node_type: String },

    /// A node was removed from the graph
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: NodeId, node_type: String },

    /// An edge was created
    #[serde(rename_all = "camelCase")]
    ConnectionCreated { output: PortRef, input: PortRef },

    /// An edge was removed
    #[serde(rename_all = "camelCase")]
    ConnectionRemoved { output: PortRef, input: PortRef },

    /// A node's ports were changed to match its declared schema
    #[serde(rename_all = "camelCase")]
    PortsReconciled {
        node_id: NodeId,
        added: Vec<String>,
        removed: Vec<String>,
        retyped: Vec<String>,
    },

    /// An edge could not be carried over while reconciling ports
    #[serde(rename_all = "camelCase")]
    ConnectionDropped {
        port: PortRef,
        remote: PortRef,
        reason: String,
    },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: GraphEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<GraphEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "Event buffer poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        let node_id = NodeId::new();

        sink.send(GraphEvent::NodeAdded {
            node_id,
            node_type: "add".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            GraphEvent::NodeAdded { node_id: id, node_type } => {
                assert_eq!(*id, node_id);
                assert_eq!(node_type, "add");
            }
            _ => panic!("Expected NodeAdded event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        sink.send(GraphEvent::NodeRemoved {
            node_id: NodeId::new(),
            node_type: "add".to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_event_serialization() {
        let event = GraphEvent::ConnectionCreated {
            output: PortRef::new(NodeId::new(), "value"),
            input: PortRef::new(NodeId::new(), "terms 0"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connectionCreated");
        assert_eq!(json["input"]["port"], "terms 0");
    }
}
