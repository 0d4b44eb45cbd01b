//! The node graph: an ordered arena of nodes plus graph variables
//!
//! The graph exclusively owns its nodes; a node owns its ports; edges only
//! name their remote endpoint. All structural mutation goes through
//! `&mut NodeGraph` so the edge symmetry invariant is maintained in one
//! place. Connection handling lives in `connection.rs`, port
//! reconciliation in `reconcile.rs` and value resolution in `eval.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GraphConfig;
use crate::error::{NodeGraphError, Result};
use crate::events::{EventSink, GraphEvent, NullEventSink};
use crate::node::Node;
use crate::port::Port;
use crate::registry::{NodeBehavior, NodeRegistry};
use crate::types::{NodeId, Point, PortRef, ValueType};

/// A named value stored on the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphVariable {
    pub id: String,
    pub value_type: ValueType,
    pub value: Value,
}

/// A graph of nodes connected through their ports
pub struct NodeGraph {
    id: String,
    name: String,
    nodes: Vec<Node>,
    variables: Vec<GraphVariable>,
    registry: Arc<NodeRegistry>,
    config: GraphConfig,
    events: Arc<dyn EventSink>,
}

impl NodeGraph {
    /// Create an empty graph over a registry
    pub fn new(name: impl Into<String>, registry: Arc<NodeRegistry>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            nodes: Vec::new(),
            variables: Vec::new(),
            registry,
            config: GraphConfig::default(),
            events: Arc::new(NullEventSink),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver mutation events to `events`
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub(crate) fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GraphConfig) {
        self.config = config;
    }

    // =========================================================================
    // Node lookup
    // =========================================================================

    /// All nodes in graph order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Ids of all nodes in graph order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index_of(id).is_some()
    }

    /// Position of a node in graph order
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Mutable access to a node
    ///
    /// Meant for editing `data`, `name` and `position`. Edges must be changed
    /// through the connection operations, never through `ports` directly.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub(crate) fn require_node(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(NodeGraphError::NodeNotFound(id))
    }

    pub(crate) fn require_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.node_mut(id).ok_or(NodeGraphError::NodeNotFound(id))
    }

    /// First node with the given display name
    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Resolve a port address
    pub fn port(&self, port: &PortRef) -> Option<&Port> {
        self.node(port.node).and_then(|n| n.port(&port.port))
    }

    pub(crate) fn port_mut(&mut self, port: &PortRef) -> Option<&mut Port> {
        self.node_mut(port.node).and_then(|n| n.port_mut(&port.port))
    }

    pub(crate) fn behavior(&self, node_type: &str) -> Option<Arc<dyn NodeBehavior>> {
        self.registry.get_behavior(node_type)
    }

    pub(crate) fn emit(&self, event: GraphEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver graph event: {}", e);
        }
    }

    // =========================================================================
    // Node lifecycle
    // =========================================================================

    /// Instantiate a registered node type at the origin
    pub fn add_node(&mut self, node_type: &str) -> Result<NodeId> {
        self.add_node_at(node_type, Point::default())
    }

    /// Instantiate a registered node type at a position
    pub fn add_node_at(&mut self, node_type: &str, position: Point) -> Result<NodeId> {
        self.add_node_with(node_type, None, position, None)
    }

    /// Instantiate a registered node type with an explicit name and data
    ///
    /// `data` is laid over the type's default data field by field when both
    /// are objects, and replaces it otherwise.
    pub fn add_node_with(
        &mut self,
        node_type: &str,
        name: Option<&str>,
        position: Point,
        data: Option<Value>,
    ) -> Result<NodeId> {
        let definition = self
            .registry
            .get_definition(node_type)
            .ok_or_else(|| NodeGraphError::UnknownNodeType(node_type.to_string()))?;

        let mut node = Node::new(
            node_type,
            name.unwrap_or(&definition.label),
            definition.default_data.clone(),
        );
        node.position = position;
        if let Some(data) = data {
            merge_data(&mut node.data, data);
        }
        self.insert_node(node)
    }

    /// Append a node, reconcile its ports and initialize it
    pub(crate) fn insert_node(&mut self, node: Node) -> Result<NodeId> {
        let id = node.id;
        let node_type = node.node_type.clone();
        log::debug!("Adding node '{}' ({}) as {}", node.name, node_type, id);
        self.nodes.push(node);
        self.emit(GraphEvent::NodeAdded {
            node_id: id,
            node_type,
        });
        self.reconcile_node(id)?;
        self.initialize_node(id);
        Ok(id)
    }

    /// Run the node's `initialize` hook
    pub(crate) fn initialize_node(&mut self, id: NodeId) {
        let registry = self.registry.clone();
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if let Some(behavior) = registry.get_behavior(&node.node_type) {
            behavior.initialize(node);
        }
    }

    /// Remove a node after clearing every edge on its ports
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node> {
        self.clear_node_connections(id)?;
        let index = self.index_of(id).ok_or(NodeGraphError::NodeNotFound(id))?;
        let node = self.nodes.remove(index);
        log::debug!("Removed node '{}' ({})", node.name, id);
        self.emit(GraphEvent::NodeRemoved {
            node_id: id,
            node_type: node.node_type.clone(),
        });
        Ok(node)
    }

    /// Copy a node's persisted state into a new node without edges
    pub fn duplicate(&mut self, id: NodeId) -> Result<NodeId> {
        let mut copy = self.require_node(id)?.detached_copy();
        copy.position = copy.position.offset(self.config.duplicate_offset);
        self.insert_node(copy)
    }

    /// Deep copy of the whole graph with the same edge topology
    ///
    /// Nodes get new ids. Edges are replayed through `connect` from their
    /// output side, so each edge is created exactly once.
    pub fn copy_graph(&self) -> Result<NodeGraph> {
        let mut copy = NodeGraph::new(self.name.clone(), self.registry.clone())
            .with_config(self.config.clone())
            .with_event_sink(self.events.clone());
        copy.variables = self.variables.clone();

        let mut id_map: HashMap<NodeId, NodeId> = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let new_id = copy.insert_node(node.detached_copy())?;
            id_map.insert(node.id, new_id);
        }

        for node in &self.nodes {
            for port in node.outputs() {
                for connection in &port.connections {
                    let (Some(&output_node), Some(&input_node)) =
                        (id_map.get(&node.id), id_map.get(&connection.node))
                    else {
                        log::warn!(
                            "Skipping dangling edge {} -> {} while copying",
                            port.port_ref(),
                            connection.target()
                        );
                        continue;
                    };
                    let output = PortRef::new(output_node, port.name.clone());
                    let input = PortRef::new(input_node, connection.port.clone());
                    match copy.connect(&output, &input) {
                        Ok(()) if !connection.waypoints.is_empty() => {
                            copy.set_waypoints(&output, &input, connection.waypoints.clone())?;
                        }
                        Ok(()) => {}
                        Err(e) => log::warn!("Edge not copied: {}", e),
                    }
                }
            }
        }

        // Replay follows node order; restore each port's original edge order
        for node in &self.nodes {
            let Some(copied) = id_map.get(&node.id).and_then(|&id| copy.node_mut(id)) else {
                continue;
            };
            for port in node.ports.values() {
                let Some(target) = copied.port_mut(&port.name) else {
                    continue;
                };
                let order: Vec<(NodeId, &str)> = port
                    .connections
                    .iter()
                    .filter_map(|c| id_map.get(&c.node).map(|&id| (id, c.port.as_str())))
                    .collect();
                target.connections.sort_by_key(|c| {
                    order
                        .iter()
                        .position(|&(id, name)| id == c.node && name == c.port)
                        .unwrap_or(order.len())
                });
            }
        }

        Ok(copy)
    }

    /// Move a node to a new position in graph order
    pub fn move_node_to(&mut self, id: NodeId, index: usize) -> Result<()> {
        let from = self.index_of(id).ok_or(NodeGraphError::NodeNotFound(id))?;
        let node = self.nodes.remove(from);
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, node);
        Ok(())
    }

    /// Change a node's display name
    pub fn rename_node(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        self.require_node_mut(id)?.name = name.into();
        Ok(())
    }

    /// Move a node in the editor
    pub fn set_position(&mut self, id: NodeId, position: Point) -> Result<()> {
        self.require_node_mut(id)?.position = position;
        Ok(())
    }

    /// Remove every node
    pub fn clear(&mut self) {
        for id in self.node_ids() {
            if let Err(e) = self.remove_node(id) {
                log::warn!("Failed to remove node {}: {}", id, e);
            }
        }
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Set a variable, replacing any variable with the same id
    pub fn set_variable(&mut self, id: impl Into<String>, value_type: ValueType, value: Value) {
        let id = id.into();
        match self.variables.iter_mut().find(|v| v.id == id) {
            Some(variable) => {
                variable.value_type = value_type;
                variable.value = value;
            }
            None => self.variables.push(GraphVariable {
                id,
                value_type,
                value,
            }),
        }
    }

    pub fn variable(&self, id: &str) -> Option<&GraphVariable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn remove_variable(&mut self, id: &str) -> Option<GraphVariable> {
        let index = self.variables.iter().position(|v| v.id == id)?;
        Some(self.variables.remove(index))
    }

    pub fn variables(&self) -> &[GraphVariable] {
        &self.variables
    }

    pub(crate) fn set_variables(&mut self, variables: Vec<GraphVariable>) {
        self.variables = variables;
    }

    /// Replace the node list without reconciliation; used by restore
    pub(crate) fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
    }
}

impl std::fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeGraph")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("variables", &self.variables.len())
            .finish()
    }
}

/// Lay `overlay` over `base`: objects merge per field, anything else replaces
fn merge_data(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(fields), Value::Object(overlay)) => {
            for (key, value) in overlay {
                fields.insert(key, value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}
