//! Core types shared across the graph
//!
//! These types describe identities, port shapes and value types. They are
//! the vocabulary of both the schema (per node type) and the instance model
//! (per node).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a node
///
/// Edges reference nodes by this id, never by address, so a graph survives a
/// serialization round-trip with its edges intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// Receives values from upstream outputs
    Input,
    /// Produces values for downstream inputs
    Output,
}

/// How many edges a port may hold at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// Any number of edges
    #[default]
    Multiple,
    /// At most one edge; a new connection replaces the old one
    Override,
}

/// Which remote value types a port accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeConstraint {
    /// Accepts any remote type
    #[default]
    None,
    /// Accepts a remote type assignable to or from this port's type
    Inherited,
    /// Accepts only exactly this port's type
    Strict,
}

/// Semantic type token carried by a port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Root type, every type is assignable to it
    Any,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// Any numeric value (Int or Float)
    Number,
    /// Text string
    String,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// RGBA color
    Color,
    /// Arbitrary JSON value
    Json,
    /// Host-defined type, only assignable from itself
    Custom(String),
}

impl ValueType {
    /// Check whether a value of type `other` can be stored in a slot of this type
    pub fn is_assignable_from(&self, other: &ValueType) -> bool {
        if self == other {
            return true;
        }
        match self {
            ValueType::Any => true,
            ValueType::Number => matches!(other, ValueType::Int | ValueType::Float),
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Number => write!(f, "number"),
            ValueType::String => write!(f, "string"),
            ValueType::Vector2 => write!(f, "vector2"),
            ValueType::Vector3 => write!(f, "vector3"),
            ValueType::Color => write!(f, "color"),
            ValueType::Json => write!(f, "json"),
            ValueType::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A 2D coordinate (node positions, edge waypoints)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset this point by a (dx, dy) pair
    pub fn offset(self, (dx, dy): (f64, f64)) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Address of a port within a graph: owning node plus port name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// Category of a node type, used to group creation menus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Constant and source nodes
    Input,
    /// Arithmetic nodes
    Math,
    /// Logic and comparison nodes
    Logic,
    /// Conversion and passthrough nodes
    Utility,
    /// Host-defined nodes
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_assignability() {
        assert!(ValueType::Any.is_assignable_from(&ValueType::String));
        assert!(!ValueType::String.is_assignable_from(&ValueType::Any));
        assert!(ValueType::Number.is_assignable_from(&ValueType::Int));
        assert!(ValueType::Number.is_assignable_from(&ValueType::Float));
        assert!(!ValueType::Float.is_assignable_from(&ValueType::Int));
        assert!(!ValueType::Int.is_assignable_from(&ValueType::Float));
    }

    #[test]
    fn test_custom_types_only_match_themselves() {
        let mesh = ValueType::Custom("mesh".to_string());
        assert!(mesh.is_assignable_from(&ValueType::Custom("mesh".to_string())));
        assert!(!mesh.is_assignable_from(&ValueType::Custom("curve".to_string())));
        assert!(ValueType::Any.is_assignable_from(&mesh));
    }

    #[test]
    fn test_value_type_serialization() {
        let json = serde_json::to_string(&ValueType::Vector2).unwrap();
        assert_eq!(json, "\"vector2\"");
        let custom: ValueType = serde_json::from_str("{\"custom\":\"mesh\"}").unwrap();
        assert_eq!(custom, ValueType::Custom("mesh".to_string()));
    }

    #[test]
    fn test_node_id_serializes_transparently() {
        let id = NodeId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
