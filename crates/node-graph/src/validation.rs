//! Structural validation of node graphs
//!
//! `verify` reports corruption that the graph operations themselves never
//! produce but a hand-edited or partially loaded snapshot can contain:
//! unknown node types, dangling or one-sided edges, overfull `Override`
//! ports, gaps in dynamic list indices. It also reports dataflow cycles, which are legal unless
//! `GraphConfig::reject_cycles` is set.
//!
//! `NodeGraph::prune` removes the edges `verify` would complain about.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::NodeGraph;
use crate::schema::parse_list_element;
use crate::types::{Multiplicity, NodeId, PortRef};

/// A structural problem found in a graph
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A node's type is not in the registry
    UnknownNodeType { node_id: NodeId, node_type: String },
    /// An edge names a node or port that does not exist
    DanglingConnection { port: PortRef, remote: PortRef },
    /// An edge is stored on only one of its endpoints
    AsymmetricConnection { port: PortRef, remote: PortRef },
    /// An edge joins two ports of the same direction
    DirectionViolation { port: PortRef, remote: PortRef },
    /// An `Override` port holds more than one edge
    OverrideViolation { port: PortRef, count: usize },
    /// A dynamic list skips an index; reconciling the node closes the gap
    ListIndexGap { node_id: NodeId, list: String, missing: usize },
    /// The nodes form a dataflow cycle
    CycleDetected { nodes: Vec<NodeId> },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNodeType { node_id, node_type } => {
                write!(f, "Unknown node type '{}' for node '{}'", node_type, node_id)
            }
            Self::DanglingConnection { port, remote } => {
                write!(f, "Edge from '{}' references missing port '{}'", port, remote)
            }
            Self::AsymmetricConnection { port, remote } => {
                write!(f, "Edge '{}' -> '{}' has no mirror on the remote port", port, remote)
            }
            Self::DirectionViolation { port, remote } => {
                write!(f, "Edge '{}' -> '{}' joins ports of the same direction", port, remote)
            }
            Self::OverrideViolation { port, count } => {
                write!(f, "Single-edge port '{}' holds {} edges", port, count)
            }
            Self::ListIndexGap { node_id, list, missing } => {
                write!(f, "List '{}' of node '{}' has no element {}", list, node_id, missing)
            }
            Self::CycleDetected { nodes } => {
                write!(f, "Cycle detected through {} nodes", nodes.len())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a graph for structural problems
///
/// Returns all problems found, not just the first.
pub fn verify(graph: &NodeGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_node_types(graph, &mut errors);
    validate_connections(graph, &mut errors);
    validate_multiplicity(graph, &mut errors);
    validate_lists(graph, &mut errors);
    detect_cycles(graph, &mut errors);

    errors
}

fn validate_node_types(graph: &NodeGraph, errors: &mut Vec<ValidationError>) {
    for node in graph.nodes() {
        if !graph.registry().has_node_type(&node.node_type) {
            errors.push(ValidationError::UnknownNodeType {
                node_id: node.id,
                node_type: node.node_type.clone(),
            });
        }
    }
}

fn validate_connections(graph: &NodeGraph, errors: &mut Vec<ValidationError>) {
    for node in graph.nodes() {
        for port in node.ports.values() {
            let local = port.port_ref();
            for connection in &port.connections {
                let remote = connection.target();
                match graph.port(&remote) {
                    None => errors.push(ValidationError::DanglingConnection {
                        port: local.clone(),
                        remote,
                    }),
                    Some(remote_port) if remote_port.direction == port.direction => {
                        errors.push(ValidationError::DirectionViolation {
                            port: local.clone(),
                            remote,
                        })
                    }
                    Some(remote_port) if !remote_port.is_connected_to(&local) => {
                        errors.push(ValidationError::AsymmetricConnection {
                            port: local.clone(),
                            remote,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

fn validate_multiplicity(graph: &NodeGraph, errors: &mut Vec<ValidationError>) {
    for node in graph.nodes() {
        for port in node.ports.values() {
            if port.multiplicity == Multiplicity::Override && port.connections.len() > 1 {
                errors.push(ValidationError::OverrideViolation {
                    port: port.port_ref(),
                    count: port.connections.len(),
                });
            }
        }
    }
}

fn validate_lists(graph: &NodeGraph, errors: &mut Vec<ValidationError>) {
    for node in graph.nodes() {
        let lists: HashSet<&str> = node.ports.values().filter_map(|p| p.list_name()).collect();
        for list in lists {
            let missing = node
                .list_ports(list)
                .iter()
                .enumerate()
                .find(|(position, port)| {
                    parse_list_element(&port.name).map(|(_, index)| index) != Some(*position)
                })
                .map(|(position, _)| position);
            if let Some(missing) = missing {
                errors.push(ValidationError::ListIndexGap {
                    node_id: node.id,
                    list: list.to_string(),
                    missing,
                });
            }
        }
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
///
/// Node-level edges run from output owner to input owner.
fn detect_cycles(graph: &NodeGraph, errors: &mut Vec<ValidationError>) {
    let mut in_degree: HashMap<NodeId, usize> = graph.nodes().iter().map(|n| (n.id, 0)).collect();
    let mut downstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in graph.nodes() {
        for port in node.outputs() {
            for connection in &port.connections {
                if let Some(degree) = in_degree.get_mut(&connection.node) {
                    *degree += 1;
                    downstream.entry(node.id).or_default().push(connection.node);
                }
            }
        }
    }

    let mut queue: VecDeque<NodeId> = graph
        .nodes()
        .iter()
        .map(|n| n.id)
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut visited = HashSet::new();
    while let Some(id) = queue.pop_front() {
        visited.insert(id);
        for next in downstream.get(&id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*next);
                }
            }
        }
    }

    if visited.len() < graph.len() {
        let nodes = graph
            .nodes()
            .iter()
            .map(|n| n.id)
            .filter(|id| !visited.contains(id))
            .collect();
        errors.push(ValidationError::CycleDetected { nodes });
    }
}

impl NodeGraph {
    /// Check this graph for structural problems
    pub fn verify(&self) -> Vec<ValidationError> {
        verify(self)
    }

    /// Remove dangling, one-sided, same-direction and duplicate edges
    ///
    /// Returns how many edge entries were removed. Hooks and events are not
    /// triggered: the removed entries were never valid edges.
    pub fn prune(&mut self) -> usize {
        let mut doomed: Vec<(NodeId, String, usize)> = Vec::new();
        for node in self.nodes() {
            for port in node.ports.values() {
                let local = port.port_ref();
                let mut seen = HashSet::new();
                for (index, connection) in port.connections.iter().enumerate() {
                    let remote = connection.target();
                    let valid = self.port(&remote).is_some_and(|remote_port| {
                        remote_port.direction != port.direction && remote_port.is_connected_to(&local)
                    });
                    if !valid || !seen.insert(remote.clone()) {
                        log::warn!("Pruning corrupt edge {} -> {}", local, remote);
                        doomed.push((node.id, port.name.clone(), index));
                    }
                }
            }
        }

        // Highest index first so earlier indices stay valid
        doomed.sort_by(|a, b| b.2.cmp(&a.2));
        let removed = doomed.len();
        for (node, port, index) in doomed {
            if let Some(port) = self.port_mut(&PortRef::new(node, port)) {
                port.connections.remove(index);
            }
        }
        removed
    }
}
