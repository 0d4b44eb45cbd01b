//! Port reconciliation
//!
//! A persisted node carries the ports its type declared when it was saved.
//! Reconciliation brings those ports in line with the type's current
//! declaration:
//!
//! 1. A port whose name is declared but whose kind or shape (direction,
//!    multiplicity, type constraint) no longer matches is replaced. Its edges
//!    are carried over only if it was a static port and kept its direction.
//!    A matching port only has its value type refreshed.
//! 2. A static port that is no longer declared is removed. If the type
//!    declares it as a former name of a current port, its edges move there.
//! 3. Every declared port that is missing is created, and the edges carried
//!    over for it are reconnected where the connection rules allow it.
//! 4. Dynamic list elements take the shape of their list's declaration, or
//!    are removed if the list is gone. Elements are renumbered to close any
//!    gap in their indices, keeping their edges. Free dynamic ports are left
//!    alone.
//!
//! Running it on a node that is already consistent changes nothing.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::connection::CapturedEdge;
use crate::descriptor::PortDescriptor;
use crate::error::Result;
use crate::events::GraphEvent;
use crate::graph::NodeGraph;
use crate::node::Node;
use crate::port::{Port, PortKind};
use crate::schema::{parse_list_element, SchemaCache};
use crate::types::{NodeId, PortRef, ValueType};

/// What reconciling one node changed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub node: NodeId,
    /// Ports created
    pub added: Vec<String>,
    /// Ports removed (including replaced ones)
    pub removed: Vec<String>,
    /// Ports whose value type or list shape was refreshed in place
    pub retyped: Vec<String>,
    /// Edges carried over: (local port, remote port)
    pub reconnected: Vec<(String, PortRef)>,
    /// Edges lost: (local port at the time, remote port)
    pub dropped: Vec<(String, PortRef)>,
}

impl ReconcileReport {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            ..Self::default()
        }
    }

    /// True if reconciliation left the node untouched
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.retyped.is_empty()
            && self.reconnected.is_empty()
            && self.dropped.is_empty()
    }
}

/// Port changes computed for one node, before they are applied
#[derive(Debug, Default)]
struct PortPlan {
    /// Ports to remove, with the port their edges move to
    removals: Vec<(String, Option<String>)>,
    /// Ports that only need a new value type
    retypes: Vec<(String, ValueType)>,
    /// List elements that take a new shape from their list declaration
    reshapes: Vec<(String, PortDescriptor)>,
    /// List elements moved down to close a gap: (current name, new index)
    renumbers: Vec<(String, usize, PortDescriptor)>,
    /// Declared ports to create
    additions: Vec<PortDescriptor>,
}

impl PortPlan {
    fn is_empty(&self) -> bool {
        self.removals.is_empty()
            && self.retypes.is_empty()
            && self.reshapes.is_empty()
            && self.renumbers.is_empty()
            && self.additions.is_empty()
    }
}

fn plan_ports(node: &Node, schema: &SchemaCache) -> PortPlan {
    let descriptors = schema.descriptors(&node.node_type);
    let declared = |name: &str| descriptors.iter().find(|d| d.name == name && !d.dynamic_list);
    let mut plan = PortPlan::default();

    for port in node.ports.values() {
        match (declared(port.name.as_str()), &port.kind) {
            (Some(descriptor), PortKind::Static) if port.matches_shape(descriptor) => {
                if port.value_type != descriptor.value_type {
                    plan.retypes
                        .push((port.name.clone(), descriptor.value_type.clone()));
                }
            }
            (Some(descriptor), kind) => {
                let salvage = *kind == PortKind::Static && port.direction == descriptor.direction;
                plan.removals
                    .push((port.name.clone(), salvage.then(|| port.name.clone())));
            }
            (None, PortKind::Static) => {
                let renamed = schema
                    .rename_of(&node.node_type, &port.name)
                    .filter(|current| declared(*current).is_some())
                    .map(str::to_string);
                plan.removals.push((port.name.clone(), renamed));
            }
            (None, PortKind::ListElement { list }) => {
                match descriptors.iter().find(|d| &d.name == list && d.dynamic_list) {
                    Some(_) if parse_list_element(&port.name).map(|(l, _)| l) != Some(list.as_str()) => {
                        plan.removals.push((port.name.clone(), None))
                    }
                    Some(descriptor) if port.matches_shape(descriptor) => {
                        if port.value_type != descriptor.value_type {
                            plan.retypes
                                .push((port.name.clone(), descriptor.value_type.clone()));
                        }
                    }
                    Some(descriptor) => plan.reshapes.push((port.name.clone(), descriptor.clone())),
                    None => plan.removals.push((port.name.clone(), None)),
                }
            }
            (None, PortKind::Dynamic) => {}
        }
    }

    // Ascending order: each target index is free by the time its element moves
    for descriptor in descriptors.iter().filter(|d| d.dynamic_list) {
        for (position, port) in node.list_ports(&descriptor.name).into_iter().enumerate() {
            let index = parse_list_element(&port.name).map(|(_, index)| index);
            if index != Some(position) {
                plan.renumbers
                    .push((port.name.clone(), position, descriptor.clone()));
            }
        }
    }

    let removed: HashSet<&str> = plan.removals.iter().map(|(name, _)| name.as_str()).collect();
    for descriptor in descriptors.iter().filter(|d| !d.dynamic_list) {
        if !node.has_port(&descriptor.name) || removed.contains(descriptor.name.as_str()) {
            plan.additions.push(descriptor.clone());
        }
    }
    plan
}

/// Sort a node's ports: declared ports in declaration order, list elements
/// at their list's position by index, free dynamic ports last
pub(crate) fn order_ports(node: &mut Node, descriptors: &[PortDescriptor]) {
    let position = |name: &str| {
        descriptors
            .iter()
            .position(|d| d.name == name)
            .unwrap_or(descriptors.len())
    };
    let rank = |port: &Port| match &port.kind {
        PortKind::Static => (position(port.name.as_str()), 0, 0),
        PortKind::ListElement { list } => (
            position(list.as_str()),
            1,
            parse_list_element(&port.name).map_or(0, |(_, index)| index),
        ),
        PortKind::Dynamic => (descriptors.len(), 2, 0),
    };
    node.ports.sort_by(|_, a, _, b| rank(a).cmp(&rank(b)));
}

impl NodeGraph {
    /// Bring one node's ports in line with its type's declaration
    ///
    /// Nodes of unregistered types are left untouched.
    pub fn reconcile_node(&mut self, id: NodeId) -> Result<ReconcileReport> {
        let registry = self.registry().clone();
        let schema = registry.schema();
        let node = self.require_node(id)?;
        let mut report = ReconcileReport::new(id);

        if !schema.has_node_type(&node.node_type) {
            log::warn!(
                "Node '{}' has unregistered type '{}'; leaving its ports as they are",
                node.name,
                node.node_type
            );
            return Ok(report);
        }
        let plan = plan_ports(node, schema);
        if plan.is_empty() {
            return Ok(report);
        }
        let node_type = node.node_type.clone();

        // Edges carried over, keyed by the port that will receive them
        let mut pending: IndexMap<String, Vec<(PortRef, CapturedEdge)>> = IndexMap::new();

        for (name, carry_to) in plan.removals {
            let local = PortRef::new(id, name.clone());
            let edges = self.take_edges(&local);
            self.require_node_mut(id)?.ports.shift_remove(&name);
            match carry_to {
                Some(target) => pending
                    .entry(target)
                    .or_default()
                    .extend(edges.into_iter().map(|edge| (local.clone(), edge))),
                None => {
                    for edge in edges {
                        self.drop_edge(&mut report, &local, edge.remote, "port is no longer declared");
                    }
                }
            }
            report.removed.push(name);
        }

        for (name, value_type) in plan.retypes {
            if let Some(port) = self.require_node_mut(id)?.port_mut(&name) {
                port.value_type = value_type;
            }
            report.retyped.push(name);
        }

        for (name, descriptor) in plan.reshapes {
            let local = PortRef::new(id, name.clone());
            let edges = self.take_edges(&local);
            if let Some(port) = self.require_node_mut(id)?.port_mut(&name) {
                port.apply_shape(&descriptor);
            }
            report.retyped.push(name);
            for edge in edges {
                self.restore_edge(&mut report, &local, &local, edge);
            }
        }

        for (name, index, descriptor) in plan.renumbers {
            let former = PortRef::new(id, name.clone());
            let edges = self.take_edges(&former);
            let port = Port::list_element(&descriptor, id, index);
            let local = PortRef::new(id, port.name.clone());
            let instance = self.require_node_mut(id)?;
            instance.ports.shift_remove(&name);
            instance.ports.insert(port.name.clone(), port);
            report.removed.push(name);
            report.added.push(local.port.clone());
            for edge in edges {
                self.restore_edge(&mut report, &former, &local, edge);
            }
        }

        for descriptor in plan.additions {
            let port = Port::from_descriptor(&descriptor, id);
            self.require_node_mut(id)?
                .ports
                .insert(descriptor.name.clone(), port);
            let local = PortRef::new(id, descriptor.name.clone());
            for (former, edge) in pending.shift_remove(&descriptor.name).unwrap_or_default() {
                self.restore_edge(&mut report, &former, &local, edge);
            }
            report.added.push(descriptor.name);
        }

        for (target, edges) in pending {
            for (former, edge) in edges {
                let reason = format!("port '{}' already exists", target);
                self.drop_edge(&mut report, &former, edge.remote, reason);
            }
        }

        order_ports(self.require_node_mut(id)?, schema.descriptors(&node_type));

        log::info!(
            "Reconciled node {} ({}): {} added, {} removed, {} retyped, {} reconnected, {} dropped",
            id,
            node_type,
            report.added.len(),
            report.removed.len(),
            report.retyped.len(),
            report.reconnected.len(),
            report.dropped.len()
        );
        self.emit(GraphEvent::PortsReconciled {
            node_id: id,
            added: report.added.clone(),
            removed: report.removed.clone(),
            retyped: report.retyped.clone(),
        });
        Ok(report)
    }

    /// Reconcile every node; returns the reports of nodes that changed
    pub fn reconcile_all(&mut self) -> Result<Vec<ReconcileReport>> {
        let mut reports = Vec::new();
        for id in self.node_ids() {
            let report = self.reconcile_node(id)?;
            if !report.is_empty() {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    fn restore_edge(&mut self, report: &mut ReconcileReport, former: &PortRef, local: &PortRef, edge: CapturedEdge) {
        let remote = edge.remote.clone();
        match self.reattach(local, edge) {
            Ok(()) => {
                if former != local {
                    log::info!("Moved edge to {} from {} onto {}", remote, former.port, local.port);
                }
                report.reconnected.push((local.port.clone(), remote));
            }
            Err(e) => self.drop_edge(report, former, remote, e.to_string()),
        }
    }

    fn drop_edge(&self, report: &mut ReconcileReport, port: &PortRef, remote: PortRef, reason: impl Into<String>) {
        let reason = reason.into();
        log::info!("Dropped edge {} - {}: {}", port, remote, reason);
        self.emit(GraphEvent::ConnectionDropped {
            port: port.clone(),
            remote: remote.clone(),
            reason,
        });
        report.dropped.push((port.port.clone(), remote));
    }
}
