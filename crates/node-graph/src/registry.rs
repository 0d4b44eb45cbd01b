//! Node type registry
//!
//! This module maps node type strings to their definitions and behaviors.
//! It is the explicit replacement for runtime type discovery: every node
//! type a graph can hold is registered here, either by hand or at link
//! time through `inventory`.
//!
//! # Usage
//!
//! ```ignore
//! use node_graph::{NodeRegistry, NodeDescriptor};
//!
//! let mut registry = NodeRegistry::new();
//! registry.register(MyNode::definition(), Arc::new(MyNode));
//!
//! // Or collect every type submitted with `inventory::submit!`
//! let registry = NodeRegistry::with_builtins();
//! ```
//!
//! The registry also owns the schema cache. It is built on first use and
//! discarded whenever a registration changes.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::descriptor::NodeDefinition;
use crate::error::Result;
use crate::eval::EvalContext;
use crate::node::Node;
use crate::schema::SchemaCache;
use crate::types::{NodeCategory, PortRef};

/// Per-node-type capabilities
///
/// All hooks have defaults so a node type only implements what it needs.
/// Hooks receive the node instance they are called for.
pub trait NodeBehavior: Send + Sync {
    /// Compute the value of one of the node's output ports
    ///
    /// Input values are pulled through `ctx`, which walks edges upstream.
    fn compute_output(
        &self,
        node: &Node,
        port: &str,
        _ctx: &mut EvalContext<'_>,
    ) -> Result<serde_json::Value> {
        log::warn!(
            "Node type '{}' does not compute output '{}'; returning null",
            node.node_type,
            port
        );
        Ok(serde_json::Value::Null)
    }

    /// Called once per activation, after the node's ports are reconciled
    fn initialize(&self, _node: &mut Node) {}

    /// Called after an edge is attached to one of the node's ports
    fn on_connection_created(&self, _node: &mut Node, _port: &str, _remote: &PortRef) {}

    /// Called after an edge is detached from one of the node's ports
    fn on_connection_removed(&self, _node: &mut Node, _port: &str, _remote: &PortRef) {}
}

/// Behavior for metadata-only registrations
struct InertBehavior;

impl NodeBehavior for InertBehavior {}

/// Link-time registration of a node type
///
/// # Example
///
/// ```ignore
/// inventory::submit!(node_graph::NodeTypeFn {
///     definition: AddNode::definition,
///     behavior: || Arc::new(AddNode),
/// });
/// ```
pub struct NodeTypeFn {
    /// Function producing the node type's definition
    pub definition: fn() -> NodeDefinition,
    /// Factory function for the node type's behavior
    pub behavior: fn() -> Arc<dyn NodeBehavior>,
}

inventory::collect!(NodeTypeFn);

/// A registration entry combining a definition with its behavior
struct RegistryEntry {
    definition: NodeDefinition,
    behavior: Arc<dyn NodeBehavior>,
}

/// Registry of node types with their definitions and behaviors
pub struct NodeRegistry {
    entries: IndexMap<String, RegistryEntry>,
    schema: OnceCell<SchemaCache>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            schema: OnceCell::new(),
        }
    }

    /// Create a registry holding every node type submitted via `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<NodeTypeFn> {
            registry.register((registration.definition)(), (registration.behavior)());
        }
        registry
    }

    /// Register a node type with its behavior
    ///
    /// Replaces any earlier registration of the same node type.
    pub fn register(&mut self, definition: NodeDefinition, behavior: Arc<dyn NodeBehavior>) {
        log::debug!("Registering node type '{}'", definition.node_type);
        self.entries.insert(
            definition.node_type.clone(),
            RegistryEntry {
                definition,
                behavior,
            },
        );
        self.invalidate_schema();
    }

    /// Register a node type with a definition only
    ///
    /// Nodes of this type have ports but compute null outputs.
    pub fn register_definition(&mut self, definition: NodeDefinition) {
        self.register(definition, Arc::new(InertBehavior));
    }

    /// Remove a node type
    pub fn unregister(&mut self, node_type: &str) -> Option<NodeDefinition> {
        let removed = self.entries.shift_remove(node_type).map(|e| e.definition);
        if removed.is_some() {
            self.invalidate_schema();
        }
        removed
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same node_type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
        self.invalidate_schema();
    }

    fn invalidate_schema(&mut self) {
        self.schema.take();
    }

    /// The schema cache, built on first access
    pub fn schema(&self) -> &SchemaCache {
        self.schema
            .get_or_init(|| SchemaCache::build(self.entries.values().map(|e| &e.definition)))
    }

    /// Get the definition of a node type
    pub fn get_definition(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.entries.get(node_type).map(|e| &e.definition)
    }

    /// Get the behavior of a node type
    pub fn get_behavior(&self, node_type: &str) -> Option<Arc<dyn NodeBehavior>> {
        self.entries.get(node_type).map(|e| e.behavior.clone())
    }

    /// Get all registered definitions, in registration order
    pub fn all_definitions(&self) -> Vec<&NodeDefinition> {
        self.entries.values().map(|e| &e.definition).collect()
    }

    /// Get definitions grouped by category
    pub fn definitions_by_category(&self) -> HashMap<NodeCategory, Vec<&NodeDefinition>> {
        let mut grouped: HashMap<NodeCategory, Vec<&NodeDefinition>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.definition.category)
                .or_default()
                .push(&entry.definition);
        }
        grouped
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// List all registered node type strings
    pub fn node_types(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
