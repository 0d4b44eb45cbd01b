//! Edge operations on the graph
//!
//! Every edge is appended to, and removed from, both of its endpoints in the
//! same operation. Connection hooks run output side first.
//!
//! Dynamic port lists are edited here as well: inserting, removing or moving
//! an element shifts the edges of the following elements one slot, so every
//! edge stays attached to the same logical entry.

use std::collections::HashSet;

use serde_json::Value;

use crate::descriptor::PortDescriptor;
use crate::error::{ConnectError, NodeGraphError, Result};
use crate::events::GraphEvent;
use crate::graph::NodeGraph;
use crate::node::Node;
use crate::port::{Port, PortConnection, PortKind};
use crate::reconcile::order_ports;
use crate::schema::list_element_name;
use crate::types::{Multiplicity, NodeId, Point, PortDirection, PortRef, TypeConstraint, ValueType};

/// An edge taken off a port, to be attached somewhere else
pub(crate) struct CapturedEdge {
    pub remote: PortRef,
    pub waypoints: Vec<Point>,
}

#[derive(Clone, Copy)]
enum Hook {
    Created,
    Removed,
}

impl NodeGraph {
    fn resolve(&self, port: &PortRef) -> std::result::Result<&Port, ConnectError> {
        let node = self
            .node(port.node)
            .ok_or(ConnectError::UnknownNode(port.node))?;
        node.port(&port.port).ok_or_else(|| ConnectError::UnknownPort {
            node: port.node,
            port: port.port.clone(),
        })
    }

    /// Check whether `a` and `b` may be connected, without changing anything
    pub fn can_connect(&self, a: &PortRef, b: &PortRef) -> std::result::Result<(), ConnectError> {
        let port_a = self.resolve(a)?;
        let port_b = self.resolve(b)?;

        if a == b {
            return Err(ConnectError::SelfConnection(a.clone()));
        }
        if port_a.direction == port_b.direction {
            return Err(ConnectError::DirectionMismatch {
                a: a.clone(),
                b: b.clone(),
            });
        }
        if port_a.is_connected_to(b) || port_b.is_connected_to(a) {
            return Err(ConnectError::AlreadyConnected {
                a: a.clone(),
                b: b.clone(),
            });
        }
        for (port, remote) in [(port_a, port_b), (port_b, port_a)] {
            if !port.accepts_type(&remote.value_type) {
                return Err(ConnectError::TypeConstraintViolation {
                    port: port.port_ref(),
                    expected: port.value_type.clone(),
                    found: remote.value_type.clone(),
                });
            }
        }

        if self.config().reject_cycles {
            let (output, input) = if port_a.is_output() { (a, b) } else { (b, a) };
            if self.reaches(input.node, output.node) {
                return Err(ConnectError::CycleRejected {
                    output: output.clone(),
                    input: input.clone(),
                });
            }
        }

        Ok(())
    }

    /// Check whether `to` is downstream of (or equal to) `from`
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.node(id) {
                for port in node.outputs() {
                    stack.extend(port.connections.iter().map(|c| c.node));
                }
            }
        }
        false
    }

    /// Connect two ports
    ///
    /// Endpoints with `Override` multiplicity lose their existing edges
    /// first. Nothing changes if the connection is refused.
    pub fn connect(&mut self, a: &PortRef, b: &PortRef) -> std::result::Result<(), ConnectError> {
        self.can_connect(a, b)?;
        let (output, input) = self.orient(a, b);

        for endpoint in [&output, &input] {
            let overrides = self
                .port(endpoint)
                .is_some_and(|p| p.multiplicity == Multiplicity::Override);
            if overrides {
                self.detach_all(endpoint);
            }
        }

        if let Some(port) = self.port_mut(&output) {
            port.connections
                .push(PortConnection::new(input.node, input.port.clone()));
        }
        if let Some(port) = self.port_mut(&input) {
            port.connections
                .push(PortConnection::new(output.node, output.port.clone()));
        }
        log::debug!("Connected {} -> {}", output, input);

        self.notify(&output, &input, Hook::Created);
        self.notify(&input, &output, Hook::Created);
        self.emit(GraphEvent::ConnectionCreated { output, input });
        Ok(())
    }

    /// Remove the edge between two ports
    ///
    /// Returns false if they were not connected.
    pub fn disconnect(&mut self, a: &PortRef, b: &PortRef) -> bool {
        let from_a = self.port_mut(a).and_then(|p| take_connection(p, b));
        let from_b = self.port_mut(b).and_then(|p| take_connection(p, a));
        if from_a.is_none() && from_b.is_none() {
            return false;
        }

        let (output, input) = self.orient(a, b);
        log::debug!("Disconnected {} -> {}", output, input);
        self.notify(&output, &input, Hook::Removed);
        self.notify(&input, &output, Hook::Removed);
        self.emit(GraphEvent::ConnectionRemoved { output, input });
        true
    }

    /// Remove every edge of a port; returns how many were removed
    pub fn clear_port(&mut self, port: &PortRef) -> Result<usize> {
        if self.port(port).is_none() {
            return Err(NodeGraphError::PortNotFound {
                node: port.node,
                port: port.port.clone(),
            });
        }
        Ok(self.detach_all(port))
    }

    /// Remove every edge of every port of a node
    pub fn clear_node_connections(&mut self, node: NodeId) -> Result<usize> {
        let ports: Vec<String> = self.require_node(node)?.ports.keys().cloned().collect();
        Ok(ports
            .into_iter()
            .map(|name| self.detach_all(&PortRef::new(node, name)))
            .sum())
    }

    pub(crate) fn detach_all(&mut self, port: &PortRef) -> usize {
        let remotes: Vec<PortRef> = self
            .connections(port)
            .iter()
            .map(PortConnection::target)
            .collect();
        remotes
            .iter()
            .filter(|remote| self.disconnect(port, remote))
            .count()
    }

    pub fn is_connected(&self, a: &PortRef, b: &PortRef) -> bool {
        self.port(a).is_some_and(|p| p.is_connected_to(b))
    }

    /// Edges of a port in insertion order (empty if the port is unknown)
    pub fn connections(&self, port: &PortRef) -> &[PortConnection] {
        self.port(port)
            .map(|p| p.connections.as_slice())
            .unwrap_or(&[])
    }

    /// Order two endpoints as (output, input)
    fn orient(&self, a: &PortRef, b: &PortRef) -> (PortRef, PortRef) {
        let a_is_output = match self.port(a) {
            Some(port) => port.is_output(),
            None => self.port(b).is_some_and(Port::is_input),
        };
        if a_is_output {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    fn notify(&mut self, port: &PortRef, remote: &PortRef, hook: Hook) {
        let registry = self.registry().clone();
        let Some(node) = self.node_mut(port.node) else {
            return;
        };
        let Some(behavior) = registry.get_behavior(&node.node_type) else {
            return;
        };
        match hook {
            Hook::Created => behavior.on_connection_created(node, &port.port, remote),
            Hook::Removed => behavior.on_connection_removed(node, &port.port, remote),
        }
    }

    // =========================================================================
    // Waypoints (stored on the output side of an edge)
    // =========================================================================

    fn output_edge_mut(&mut self, a: &PortRef, b: &PortRef) -> Result<&mut PortConnection> {
        let (output, input) = self.orient(a, b);
        self.port_mut(&output)
            .and_then(|p| p.connections.iter_mut().find(|c| c.points_to(&input)))
            .ok_or_else(|| NodeGraphError::NotConnected {
                a: a.clone(),
                b: b.clone(),
            })
    }

    /// Replace the routing points of an edge
    pub fn set_waypoints(&mut self, a: &PortRef, b: &PortRef, points: Vec<Point>) -> Result<()> {
        self.output_edge_mut(a, b)?.waypoints = points;
        Ok(())
    }

    pub fn add_waypoint(&mut self, a: &PortRef, b: &PortRef, point: Point) -> Result<()> {
        self.output_edge_mut(a, b)?.waypoints.push(point);
        Ok(())
    }

    /// Routing points of an edge (empty if not connected)
    pub fn waypoints(&self, a: &PortRef, b: &PortRef) -> &[Point] {
        let (output, input) = self.orient(a, b);
        self.port(&output)
            .and_then(|p| p.connection_to(&input))
            .map(|c| c.waypoints.as_slice())
            .unwrap_or(&[])
    }

    // =========================================================================
    // Free dynamic ports
    // =========================================================================

    /// Add a port that is not backed by any declaration
    pub fn add_dynamic_port(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        direction: PortDirection,
        value_type: ValueType,
        multiplicity: Multiplicity,
        type_constraint: TypeConstraint,
    ) -> Result<PortRef> {
        let name = name.into();
        let instance = self.require_node_mut(node)?;
        if instance.has_port(&name) {
            return Err(NodeGraphError::PortExists { node, port: name });
        }
        let port = Port::dynamic(name.clone(), node, direction, value_type, multiplicity, type_constraint);
        instance.ports.insert(name.clone(), port);
        Ok(PortRef::new(node, name))
    }

    /// Disconnect and remove a free dynamic port
    pub fn remove_dynamic_port(&mut self, port: &PortRef) -> Result<()> {
        let kind = self
            .port(port)
            .map(|p| p.kind.clone())
            .ok_or_else(|| NodeGraphError::PortNotFound {
                node: port.node,
                port: port.port.clone(),
            })?;
        if kind != PortKind::Dynamic {
            return Err(NodeGraphError::NotDynamicPort {
                node: port.node,
                port: port.port.clone(),
            });
        }
        self.detach_all(port);
        self.require_node_mut(port.node)?.ports.shift_remove(&port.port);
        Ok(())
    }

    // =========================================================================
    // Dynamic port lists
    // =========================================================================

    fn list_descriptor(&self, node: NodeId, list: &str) -> Result<PortDescriptor> {
        let node_type = &self.require_node(node)?.node_type;
        self.registry()
            .schema()
            .descriptor(node_type, list)
            .filter(|d| d.dynamic_list)
            .cloned()
            .ok_or_else(|| NodeGraphError::NotADynamicList {
                node_type: node_type.clone(),
                list: list.to_string(),
            })
    }

    /// Number of elements in a node's dynamic port list
    pub fn list_len(&self, node: NodeId, list: &str) -> Result<usize> {
        self.list_descriptor(node, list)?;
        Ok(self.require_node(node)?.list_len(list))
    }

    /// Append an element to a dynamic port list
    pub fn add_list_element(&mut self, node: NodeId, list: &str) -> Result<PortRef> {
        let len = self.list_len(node, list)?;
        self.insert_list_element(node, list, len)
    }

    /// Insert an empty element at `index`, shifting later elements' edges up
    pub fn insert_list_element(&mut self, node: NodeId, list: &str, index: usize) -> Result<PortRef> {
        self.insert_list_element_with(node, list, index, Vec::new())
    }

    fn insert_list_element_with(
        &mut self,
        node: NodeId,
        list: &str,
        index: usize,
        edges: Vec<CapturedEdge>,
    ) -> Result<PortRef> {
        let descriptor = self.list_descriptor(node, list)?;
        let registry = self.registry().clone();
        let instance = self.require_node_mut(node)?;
        let len = instance.list_len(list);
        if index > len {
            return Err(NodeGraphError::ListIndexOutOfRange {
                list: list.to_string(),
                index,
                len,
            });
        }

        let port = Port::list_element(&descriptor, node, len);
        if instance.has_port(&port.name) {
            return Err(NodeGraphError::PortExists {
                node,
                port: port.name,
            });
        }
        instance.ports.insert(port.name.clone(), port);
        let node_type = instance.node_type.clone();
        order_ports(instance, registry.schema().descriptors(&node_type));
        if let Some(values) = list_data_mut(instance, list) {
            if index <= values.len() {
                values.insert(index, Value::Null);
            }
        }

        for position in (index..len).rev() {
            self.shift_edges(node, list, position, position + 1);
        }

        let target = PortRef::new(node, list_element_name(list, index));
        for edge in edges {
            if let Err(e) = self.reattach(&target, edge) {
                log::info!("Dropped edge while inserting into '{}': {}", list, e);
            }
        }
        log::debug!("Inserted element {} into list '{}' of node {}", index, list, node);
        Ok(target)
    }

    /// Remove the element at `index`, shifting later elements' edges down
    ///
    /// Returns the remote ends of the removed element's edges.
    pub fn remove_list_element(&mut self, node: NodeId, list: &str, index: usize) -> Result<Vec<PortRef>> {
        Ok(self
            .take_list_element(node, list, index)?
            .into_iter()
            .map(|edge| edge.remote)
            .collect())
    }

    fn take_list_element(&mut self, node: NodeId, list: &str, index: usize) -> Result<Vec<CapturedEdge>> {
        let len = self.list_len(node, list)?;
        if index >= len {
            return Err(NodeGraphError::ListIndexOutOfRange {
                list: list.to_string(),
                index,
                len,
            });
        }

        let removed = self.take_edges(&PortRef::new(node, list_element_name(list, index)));
        for position in index + 1..len {
            self.shift_edges(node, list, position, position - 1);
        }

        let instance = self.require_node_mut(node)?;
        instance.ports.shift_remove(&list_element_name(list, len - 1));
        if let Some(values) = list_data_mut(instance, list) {
            if index < values.len() {
                values.remove(index);
            }
        }
        log::debug!("Removed element {} from list '{}' of node {}", index, list, node);
        Ok(removed)
    }

    /// Move the element at `from` to `to`, carrying its edges and data value
    pub fn move_list_element(&mut self, node: NodeId, list: &str, from: usize, to: usize) -> Result<()> {
        let len = self.list_len(node, list)?;
        for index in [from, to] {
            if index >= len {
                return Err(NodeGraphError::ListIndexOutOfRange {
                    list: list.to_string(),
                    index,
                    len,
                });
            }
        }
        if from == to {
            return Ok(());
        }

        let value = self
            .require_node(node)?
            .data_field(list)
            .and_then(|values| values.get(from))
            .cloned();
        let edges = self.take_list_element(node, list, from)?;
        self.insert_list_element_with(node, list, to, edges)?;

        if let Some(value) = value {
            if let Some(values) = list_data_mut(self.require_node_mut(node)?, list) {
                if let Some(slot) = values.get_mut(to) {
                    *slot = value;
                }
            }
        }
        Ok(())
    }

    fn shift_edges(&mut self, node: NodeId, list: &str, from: usize, to: usize) {
        let source = PortRef::new(node, list_element_name(list, from));
        let target = PortRef::new(node, list_element_name(list, to));
        for edge in self.take_edges(&source) {
            if let Err(e) = self.reattach(&target, edge) {
                log::info!("Dropped edge while shifting list '{}': {}", list, e);
            }
        }
    }

    /// Disconnect every edge of a port, remembering where they went
    pub(crate) fn take_edges(&mut self, port: &PortRef) -> Vec<CapturedEdge> {
        let edges: Vec<CapturedEdge> = self
            .connections(port)
            .iter()
            .map(|c| CapturedEdge {
                waypoints: self.waypoints(port, &c.target()).to_vec(),
                remote: c.target(),
            })
            .collect();
        for edge in &edges {
            self.disconnect(port, &edge.remote);
        }
        edges
    }

    /// Connect a captured edge to a new local port, restoring its waypoints
    pub(crate) fn reattach(&mut self, port: &PortRef, edge: CapturedEdge) -> std::result::Result<(), ConnectError> {
        self.connect(port, &edge.remote)?;
        if !edge.waypoints.is_empty() {
            if let Ok(connection) = self.output_edge_mut(port, &edge.remote) {
                connection.waypoints = edge.waypoints;
            }
        }
        Ok(())
    }
}

fn take_connection(port: &mut Port, remote: &PortRef) -> Option<PortConnection> {
    let index = port.connections.iter().position(|c| c.points_to(remote))?;
    Some(port.connections.remove(index))
}

fn list_data_mut<'a>(node: &'a mut Node, list: &str) -> Option<&'a mut Vec<Value>> {
    node.data.get_mut(list).and_then(Value::as_array_mut)
}
