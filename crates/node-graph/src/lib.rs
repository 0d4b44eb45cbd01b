//! Node Graph - port schema reconciliation and connection engine
//!
//! This crate holds the data model of a visual node graph and keeps it
//! consistent. It provides:
//!
//! - Node types declared once through a registry and a schema cache
//! - Symmetric, id-keyed edges with multiplicity and type constraints
//! - Reconciliation of live ports against the declared schema, carrying
//!   edges across renames, retypes and reshapes
//! - Dynamic port lists whose elements keep their edges when shifted
//! - Pull evaluation of output values with cycle and depth detection
//! - JSON snapshots and compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! - `NodeRegistry`: node type definitions and behaviors, with the schema
//!   cache built on first use
//! - `NodeGraph`: owns the nodes in order; every mutation goes through it
//! - `EvalContext`: one evaluation pass, pulling inputs upstream
//! - `EventSink`: generic event streaming for structural changes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use node_graph::{GraphBuilder, NodeRegistry, PortRef};
//!
//! let registry = Arc::new(NodeRegistry::with_builtins());
//! let graph = GraphBuilder::new(registry)
//!     .add_node("a", "float-constant", (0.0, 0.0))
//!     .add_node("add", "add", (200.0, 0.0))
//!     .list_elements("add", "terms", 1)
//!     .connect("a", "value", "add", "terms 0")
//!     .build()?;
//! ```

pub mod builder;
pub mod config;
pub mod connection;
pub mod descriptor;
pub mod error;
pub mod eval;
pub mod events;
pub mod graph;
pub mod node;
pub mod port;
pub mod reconcile;
pub mod registry;
pub mod schema;
pub mod snapshot;
pub mod types;
pub mod undo;
pub mod validation;

#[cfg(test)]
mod testing;

// Re-export key types
pub use builder::GraphBuilder;
pub use config::GraphConfig;
pub use descriptor::{NodeDefinition, NodeDescriptor, PortDescriptor};
pub use error::{ConnectError, NodeGraphError, Result};
pub use eval::EvalContext;
pub use events::{EventError, EventSink, GraphEvent, NullEventSink, VecEventSink};
pub use graph::{GraphVariable, NodeGraph};
pub use node::Node;
pub use port::{Port, PortConnection, PortKind};
pub use reconcile::ReconcileReport;
pub use registry::{NodeBehavior, NodeRegistry, NodeTypeFn};
pub use schema::{list_element_name, parse_list_element, SchemaCache, SchemaError};
pub use snapshot::GraphSnapshot;
pub use types::{
    Multiplicity, NodeCategory, NodeId, Point, PortDirection, PortRef, TypeConstraint, ValueType,
};
pub use undo::UndoStack;
pub use validation::{verify, ValidationError};

// Re-export inventory so node crates can submit registrations
pub use inventory;
