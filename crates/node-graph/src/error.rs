//! Error types for the node graph

use thiserror::Error;

use crate::types::{NodeId, PortDirection, PortRef, ValueType};

/// Result type alias using NodeGraphError
pub type Result<T> = std::result::Result<T, NodeGraphError>;

/// Reasons a connection attempt is refused
///
/// Connection checks never mutate the graph, so every variant is
/// recoverable. The presentation layer probes with these constantly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// One endpoint names a node that is not in the graph
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// One endpoint names a port the node does not have
    #[error("Unknown port '{port}' on node {node}")]
    UnknownPort { node: NodeId, port: String },

    /// Both endpoints are the same port
    #[error("Cannot connect port '{0}' to itself")]
    SelfConnection(PortRef),

    /// Both endpoints have the same direction
    #[error("Cannot connect '{a}' to '{b}': ports have the same direction")]
    DirectionMismatch { a: PortRef, b: PortRef },

    /// The two ports already share an edge
    #[error("'{a}' is already connected to '{b}'")]
    AlreadyConnected { a: PortRef, b: PortRef },

    /// A type constraint on either endpoint rejects the other's value type
    #[error("Type constraint on '{port}' rejects {found} (port type is {expected})")]
    TypeConstraintViolation {
        port: PortRef,
        expected: ValueType,
        found: ValueType,
    },

    /// The edge would close a dataflow cycle and cycles are rejected
    #[error("Connecting '{output}' to '{input}' would create a cycle")]
    CycleRejected { output: PortRef, input: PortRef },
}

/// Errors that can occur in the node graph
#[derive(Debug, Error)]
pub enum NodeGraphError {
    /// Node type is not registered
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node is not part of this graph
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port is not present on the node
    #[error("Port '{port}' not found on node {node}")]
    PortNotFound { node: NodeId, port: String },

    /// Named list is not a dynamic port list of the node's type
    #[error("'{list}' is not a dynamic port list of node type '{node_type}'")]
    NotADynamicList { node_type: String, list: String },

    /// List element index is out of range
    #[error("Index {index} out of range for list '{list}' of length {len}")]
    ListIndexOutOfRange {
        list: String,
        index: usize,
        len: usize,
    },

    /// No node with this display name exists
    #[error("No node named '{0}'")]
    UnknownNodeName(String),

    /// Port has the wrong direction for the requested operation
    #[error("Port '{port}' is not an {expected:?} port")]
    WrongDirection { port: PortRef, expected: PortDirection },

    /// Only free dynamic ports can be removed by hand
    #[error("Port '{port}' on node {node} is not a dynamic port")]
    NotDynamicPort { node: NodeId, port: String },

    /// Port with this name already exists on the node
    #[error("Port '{port}' already exists on node {node}")]
    PortExists { node: NodeId, port: String },

    /// The two ports share no edge
    #[error("'{a}' is not connected to '{b}'")]
    NotConnected { a: PortRef, b: PortRef },

    /// A connection was refused
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Evaluation re-entered an output that is still being computed
    #[error("Cycle detected while evaluating: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// Inputs were requested outside of an output evaluation
    #[error("Input requested outside of an output evaluation")]
    NotEvaluating,

    /// Evaluation went deeper than the configured bound
    #[error("Evaluation exceeded maximum depth of {0}")]
    DepthExceeded(usize),

    /// A node's behavior failed to compute an output
    #[error("Failed to compute '{port}' on node {node}: {message}")]
    ComputeFailed {
        node: NodeId,
        port: String,
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeGraphError {
    /// Create a compute failure for a node's output port
    pub fn compute(node: NodeId, port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComputeFailed {
            node,
            port: port.into(),
            message: message.into(),
        }
    }
}
