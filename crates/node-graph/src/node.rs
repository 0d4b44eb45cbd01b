//! Node instances
//!
//! A node owns its ports (one name-keyed map, insertion ordered) and a
//! blob of persisted fields. Behavior is not stored on the node: it is
//! looked up in the registry by `node_type`, which keeps nodes plain data
//! that can be cloned, serialized and restored.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::port::Port;
use crate::schema::parse_list_element;
use crate::types::{NodeId, Point, PortDirection};

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable identity of this node
    pub id: NodeId,
    /// Node type (references a registered NodeDefinition)
    pub node_type: String,
    /// Display name
    pub name: String,
    /// Position in the editor; not used by the engine
    #[serde(default)]
    pub position: Point,
    /// Persisted fields of this instance
    #[serde(default)]
    pub data: serde_json::Value,
    /// Ports keyed by name
    #[serde(default)]
    pub ports: IndexMap<String, Port>,
}

impl Node {
    /// Create a node with no ports; the graph reconciles ports on insertion
    pub fn new(node_type: impl Into<String>, name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            name: name.into(),
            position: Point::default(),
            data,
            ports: IndexMap::new(),
        }
    }

    /// Find a port by name
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    /// Find a port by name (mutable)
    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.get_mut(name)
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Iterate over input ports
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(|p| p.direction == PortDirection::Input)
    }

    /// Iterate over output ports
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(|p| p.direction == PortDirection::Output)
    }

    /// Elements of a dynamic port list, ordered by index
    pub fn list_ports(&self, list: &str) -> Vec<&Port> {
        let mut elements: Vec<(usize, &Port)> = self
            .ports
            .values()
            .filter(|p| p.list_name() == Some(list))
            .filter_map(|p| match parse_list_element(&p.name) {
                Some((name, index)) if name == list => Some((index, p)),
                _ => None,
            })
            .collect();
        elements.sort_by_key(|(index, _)| *index);
        elements.into_iter().map(|(_, p)| p).collect()
    }

    /// Number of elements in a dynamic port list
    pub fn list_len(&self, list: &str) -> usize {
        self.list_ports(list).len()
    }

    /// Total number of edge endpoints held by this node
    pub fn connection_count(&self) -> usize {
        self.ports.values().map(Port::connection_count).sum()
    }

    /// Read a persisted field
    pub fn data_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Read and deserialize a persisted field
    pub fn data_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Write a persisted field, turning empty data into an object first
    pub fn set_data_field(&mut self, key: impl Into<String>, value: serde_json::Value) {
        if !self.data.is_object() {
            self.data = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.into(), value);
        }
    }

    /// Copy of this node under a new id, with every edge removed
    pub(crate) fn detached_copy(&self) -> Node {
        let mut copy = self.clone();
        copy.id = NodeId::new();
        for port in copy.ports.values_mut() {
            port.node = copy.id;
            port.connections.clear();
        }
        copy
    }
}
