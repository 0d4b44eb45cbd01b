//! Port instances and their edges
//!
//! A `Port` is one endpoint of dataflow on a node instance. Its edges are
//! `PortConnection`s that name the remote node and port instead of pointing
//! at them, so a port can be serialized and reloaded without breaking edges.
//! Every edge is stored twice, once on each endpoint.

use serde::{Deserialize, Serialize};

use crate::descriptor::PortDescriptor;
use crate::schema::list_element_name;
use crate::types::{Multiplicity, NodeId, Point, PortDirection, PortRef, TypeConstraint, ValueType};

/// Where a port instance comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortKind {
    /// Created from a declared port descriptor
    Static,
    /// Added at runtime by host code; ignored by reconciliation
    Dynamic,
    /// Element of a dynamic port list backed by the descriptor `list`
    ListElement { list: String },
}

/// One edge as seen from one of its endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConnection {
    /// Remote node
    pub node: NodeId,
    /// Remote port name
    pub port: String,
    /// Routing points for drawing, ignored by evaluation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Point>,
}

impl PortConnection {
    /// Create an edge to a remote port with no waypoints
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
            waypoints: Vec::new(),
        }
    }

    /// Address of the remote port
    pub fn target(&self) -> PortRef {
        PortRef::new(self.node, self.port.clone())
    }

    /// Check whether this edge leads to the given port
    pub fn points_to(&self, remote: &PortRef) -> bool {
        self.node == remote.node && self.port == remote.port
    }
}

/// A port instance on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Port name, unique within the node
    pub name: String,
    /// Owning node
    pub node: NodeId,
    /// Input or output
    pub direction: PortDirection,
    /// Current value type; refreshed from the schema on reconciliation
    pub value_type: ValueType,
    /// Edge multiplicity rule
    pub multiplicity: Multiplicity,
    /// Type constraint applied to remote ports
    pub type_constraint: TypeConstraint,
    /// Origin of this port
    #[serde(flatten)]
    pub kind: PortKind,
    /// Edges in insertion order
    #[serde(default)]
    pub connections: Vec<PortConnection>,
}

impl Port {
    /// Create a static port from its descriptor
    pub fn from_descriptor(descriptor: &PortDescriptor, node: NodeId) -> Self {
        Self {
            name: descriptor.name.clone(),
            node,
            direction: descriptor.direction,
            value_type: descriptor.value_type.clone(),
            multiplicity: descriptor.multiplicity,
            type_constraint: descriptor.type_constraint,
            kind: PortKind::Static,
            connections: Vec::new(),
        }
    }

    /// Create the element at `index` of the dynamic list backed by `descriptor`
    pub fn list_element(descriptor: &PortDescriptor, node: NodeId, index: usize) -> Self {
        Self {
            name: list_element_name(&descriptor.name, index),
            kind: PortKind::ListElement {
                list: descriptor.name.clone(),
            },
            ..Self::from_descriptor(descriptor, node)
        }
    }

    /// Create a free dynamic port
    pub fn dynamic(
        name: impl Into<String>,
        node: NodeId,
        direction: PortDirection,
        value_type: ValueType,
        multiplicity: Multiplicity,
        type_constraint: TypeConstraint,
    ) -> Self {
        Self {
            name: name.into(),
            node,
            direction,
            value_type,
            multiplicity,
            type_constraint,
            kind: PortKind::Dynamic,
            connections: Vec::new(),
        }
    }

    /// Address of this port
    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.node, self.name.clone())
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    pub fn is_static(&self) -> bool {
        self.kind == PortKind::Static
    }

    /// Name of the backing list if this port is a list element
    pub fn list_name(&self) -> Option<&str> {
        match &self.kind {
            PortKind::ListElement { list } => Some(list),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The edge leading to `remote`, if any
    pub fn connection_to(&self, remote: &PortRef) -> Option<&PortConnection> {
        self.connections.iter().find(|c| c.points_to(remote))
    }

    /// Check whether this port has an edge to `remote`
    pub fn is_connected_to(&self, remote: &PortRef) -> bool {
        self.connection_to(remote).is_some()
    }

    /// Check whether direction, multiplicity and constraint match a descriptor
    pub fn matches_shape(&self, descriptor: &PortDescriptor) -> bool {
        self.direction == descriptor.direction
            && self.multiplicity == descriptor.multiplicity
            && self.type_constraint == descriptor.type_constraint
    }

    /// Force this port's shape and type to a descriptor's
    pub fn apply_shape(&mut self, descriptor: &PortDescriptor) {
        self.direction = descriptor.direction;
        self.multiplicity = descriptor.multiplicity;
        self.type_constraint = descriptor.type_constraint;
        self.value_type = descriptor.value_type.clone();
    }

    /// Check whether this port's type constraint admits a remote value type
    pub fn accepts_type(&self, remote: &ValueType) -> bool {
        type_constraint_allows(self.type_constraint, &self.value_type, remote)
    }
}

/// Check a type constraint of a port of type `own` against a remote type
pub fn type_constraint_allows(constraint: TypeConstraint, own: &ValueType, remote: &ValueType) -> bool {
    match constraint {
        TypeConstraint::None => true,
        TypeConstraint::Inherited => own.is_assignable_from(remote) || remote.is_assignable_from(own),
        TypeConstraint::Strict => own == remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_from_descriptor() {
        let node = NodeId::new();
        let descriptor = PortDescriptor::input("a", "A", ValueType::Float).single().strict();
        let port = Port::from_descriptor(&descriptor, node);

        assert_eq!(port.name, "a");
        assert_eq!(port.node, node);
        assert!(port.is_input());
        assert!(port.is_static());
        assert!(port.matches_shape(&descriptor));
        assert!(!port.is_connected());
    }

    #[test]
    fn test_list_element_port() {
        let descriptor = PortDescriptor::input("terms", "Terms", ValueType::Float).dynamic_list();
        let port = Port::list_element(&descriptor, NodeId::new(), 3);

        assert_eq!(port.name, "terms 3");
        assert_eq!(port.list_name(), Some("terms"));
        assert!(!port.is_static());
    }

    #[test]
    fn test_type_constraints() {
        assert!(type_constraint_allows(TypeConstraint::None, &ValueType::Int, &ValueType::String));

        assert!(type_constraint_allows(TypeConstraint::Inherited, &ValueType::Number, &ValueType::Float));
        assert!(type_constraint_allows(TypeConstraint::Inherited, &ValueType::Float, &ValueType::Number));
        assert!(!type_constraint_allows(TypeConstraint::Inherited, &ValueType::Float, &ValueType::String));

        assert!(type_constraint_allows(TypeConstraint::Strict, &ValueType::Int, &ValueType::Int));
        assert!(!type_constraint_allows(TypeConstraint::Strict, &ValueType::Int, &ValueType::Float));
        assert!(!type_constraint_allows(TypeConstraint::Strict, &ValueType::Number, &ValueType::Int));
    }

    #[test]
    fn test_port_serialization_keeps_kind() {
        let descriptor = PortDescriptor::input("terms", "Terms", ValueType::Float).dynamic_list();
        let mut port = Port::list_element(&descriptor, NodeId::new(), 0);
        port.connections.push(PortConnection::new(NodeId::new(), "value"));

        let json = serde_json::to_value(&port).unwrap();
        assert_eq!(json["kind"], "list_element");
        assert_eq!(json["list"], "terms");
        assert_eq!(json["valueType"], "float");

        let restored: Port = serde_json::from_value(json).unwrap();
        assert_eq!(restored, port);
    }
}
