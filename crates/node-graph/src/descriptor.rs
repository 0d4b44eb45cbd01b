//! Node type definitions and port descriptors
//!
//! A node type declares its ports through a `NodeDefinition`. This is the
//! single source of truth for the shape of every node of that type: the
//! schema cache is built from these definitions and the reconciler keeps
//! live port maps in sync with them.
//!
//! # Example
//!
//! ```ignore
//! use node_graph::{NodeDescriptor, NodeDefinition, PortDescriptor};
//! use node_graph::{NodeCategory, ValueType};
//!
//! impl NodeDescriptor for MyNode {
//!     fn definition() -> NodeDefinition {
//!         NodeDefinition::new("my-node", NodeCategory::Math, "My Node")
//!             .with_input(PortDescriptor::input("a", "A", ValueType::Float).single())
//!             .with_input(PortDescriptor::input("terms", "Terms", ValueType::Float).dynamic_list())
//!             .with_output(PortDescriptor::output("result", "Result", ValueType::Float).formerly("out"))
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Multiplicity, NodeCategory, PortDirection, TypeConstraint, ValueType};

/// Trait for node types that can describe their ports
///
/// Implementing this trait lets a node type provide its definition
/// for schema building and UI listing without a separate registry table.
pub trait NodeDescriptor {
    /// Get the static definition of this node type
    fn definition() -> NodeDefinition
    where
        Self: Sized;
}

/// Declared shape of one port of a node type
///
/// Descriptors are immutable once the schema cache is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescriptor {
    /// Port name, unique within the declaring type
    pub name: String,
    /// Human-readable label
    pub label: String,
    /// Input or output
    pub direction: PortDirection,
    /// Declared value type
    pub value_type: ValueType,
    /// Edge multiplicity rule
    pub multiplicity: Multiplicity,
    /// Type constraint applied to remote ports
    pub type_constraint: TypeConstraint,
    /// Whether this declaration backs a dynamic port list.
    ///
    /// List elements are instance ports named `"{name} {index}"` which
    /// inherit this descriptor's shape.
    #[serde(default)]
    pub dynamic_list: bool,
    /// Names this port was previously declared under
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub former_names: Vec<String>,
}

impl PortDescriptor {
    /// Create a new port descriptor with default multiplicity and no constraint
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        direction: PortDirection,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            direction,
            value_type,
            multiplicity: Multiplicity::Multiple,
            type_constraint: TypeConstraint::None,
            dynamic_list: false,
            former_names: Vec::new(),
        }
    }

    /// Create an input port descriptor
    pub fn input(name: impl Into<String>, label: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, label, PortDirection::Input, value_type)
    }

    /// Create an output port descriptor
    pub fn output(name: impl Into<String>, label: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, label, PortDirection::Output, value_type)
    }

    /// Allow at most one edge on this port
    pub fn single(mut self) -> Self {
        self.multiplicity = Multiplicity::Override;
        self
    }

    /// Allow any number of edges on this port
    pub fn multiple(mut self) -> Self {
        self.multiplicity = Multiplicity::Multiple;
        self
    }

    /// Accept remote types assignable to or from this port's type
    pub fn inherited(mut self) -> Self {
        self.type_constraint = TypeConstraint::Inherited;
        self
    }

    /// Accept only this exact remote type
    pub fn strict(mut self) -> Self {
        self.type_constraint = TypeConstraint::Strict;
        self
    }

    /// Turn this declaration into a dynamic port list
    pub fn dynamic_list(mut self) -> Self {
        self.dynamic_list = true;
        self
    }

    /// Record a name this port used to have, so existing edges migrate to it
    pub fn formerly(mut self, old_name: impl Into<String>) -> Self {
        self.former_names.push(old_name.into());
        self
    }
}

/// Complete definition of a node type
///
/// This describes everything needed to list a node type in a creation
/// menu and to build and reconcile the ports of its instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Unique type identifier (e.g., "float-constant")
    pub node_type: String,
    /// Category for UI grouping
    pub category: NodeCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the node does
    pub description: String,
    /// Declared input ports, in declaration order
    pub inputs: Vec<PortDescriptor>,
    /// Declared output ports, in declaration order
    pub outputs: Vec<PortDescriptor>,
    /// Persisted fields a new instance starts with
    #[serde(default)]
    pub default_data: serde_json::Value,
}

impl NodeDefinition {
    /// Create a definition with no ports
    pub fn new(
        node_type: impl Into<String>,
        category: NodeCategory,
        label: impl Into<String>,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            category,
            label: label.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            default_data: serde_json::Value::Null,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare an input port
    pub fn with_input(mut self, port: PortDescriptor) -> Self {
        self.inputs.push(port);
        self
    }

    /// Declare an output port
    pub fn with_output(mut self, port: PortDescriptor) -> Self {
        self.outputs.push(port);
        self
    }

    /// Set the persisted fields new instances start with
    pub fn with_default_data(mut self, data: serde_json::Value) -> Self {
        self.default_data = data;
        self
    }
}
