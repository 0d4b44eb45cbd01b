//! Serializable model of a graph
//!
//! A snapshot holds everything a graph persists: node order, each node's
//! ports with their edges (remote node id, remote port, waypoints) and the
//! graph variables. Registry, configuration and event sink are runtime
//! wiring and are supplied again on restore.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::error::Result;
use crate::graph::{GraphVariable, NodeGraph};
use crate::node::Node;
use crate::registry::NodeRegistry;

/// Persisted form of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub variables: Vec<GraphVariable>,
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as JSON
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read a snapshot written by `write_to`
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl NodeGraph {
    /// Capture the persisted state of this graph
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            id: self.id().to_string(),
            name: self.name().to_string(),
            nodes: self.nodes().to_vec(),
            variables: self.variables().to_vec(),
        }
    }

    /// Rebuild a graph from a snapshot
    ///
    /// Corrupt edges are pruned, every node's ports are reconciled against
    /// the registry's current schema, then every node is initialized.
    pub fn restore(snapshot: GraphSnapshot, registry: Arc<NodeRegistry>, config: GraphConfig) -> Result<NodeGraph> {
        let mut graph = NodeGraph::new(snapshot.name, registry)
            .with_config(config)
            .with_id(snapshot.id);

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for mut node in snapshot.nodes {
            if !seen.insert(node.id) {
                log::warn!("Skipping node '{}' with duplicate id {}", node.name, node.id);
                continue;
            }
            repair_port_keys(&mut node);
            nodes.push(node);
        }
        graph.set_nodes(nodes);
        graph.set_variables(snapshot.variables);

        let pruned = graph.prune();
        if pruned > 0 {
            log::warn!("Pruned {} corrupt edges while restoring '{}'", pruned, graph.name());
        }
        graph.reconcile_all()?;
        for id in graph.node_ids() {
            graph.initialize_node(id);
        }
        log::debug!("Restored graph '{}' with {} nodes", graph.name(), graph.len());
        Ok(graph)
    }
}

/// Make every port agree with its map key and owning node
fn repair_port_keys(node: &mut Node) {
    let id = node.id;
    for (key, port) in node.ports.iter_mut() {
        if port.name != *key {
            log::warn!("Port '{}' of node {} was stored under key '{}'", port.name, id, key);
            port.name = key.clone();
        }
        port.node = id;
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;
    use crate::port::PortConnection;
    use crate::testing::{self, assert_symmetric};
    use crate::types::{NodeId, Point, PortRef, ValueType};
    use serde_json::json;

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(testing::registry())
    }

    fn sample() -> NodeGraph {
        let mut graph = NodeGraph::new("sample", registry());
        let source = graph.add_node("constant").unwrap();
        let adder = graph.add_node("adder").unwrap();
        let sink = graph.add_node("sink").unwrap();
        graph.node_mut(source).unwrap().set_data_field("value", json!(2.0));
        let term = graph.add_list_element(adder, "terms").unwrap();
        graph.connect(&PortRef::new(source, "value"), &term).unwrap();
        graph
            .connect(&PortRef::new(adder, "sum"), &PortRef::new(sink, "in"))
            .unwrap();
        graph
            .set_waypoints(
                &PortRef::new(adder, "sum"),
                &PortRef::new(sink, "in"),
                vec![Point::new(10.0, 20.0)],
            )
            .unwrap();
        graph.set_variable("scale", ValueType::Float, json!(1.5));
        graph
    }

    #[test]
    fn test_json_round_trip() {
        let graph = sample();
        let snapshot = graph.snapshot();
        let json = snapshot.to_json().unwrap();
        let restored = GraphSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_restore_keeps_topology_and_values() {
        let graph = sample();
        let restored = NodeGraph::restore(graph.snapshot(), registry(), GraphConfig::default()).unwrap();

        assert_eq!(restored.id(), graph.id());
        assert_eq!(restored.node_ids(), graph.node_ids());
        assert_eq!(restored.nodes(), graph.nodes());
        assert_eq!(restored.variable("scale").unwrap().value, json!(1.5));
        assert_symmetric(&restored);

        let sink = graph.nodes()[2].id;
        assert_eq!(
            restored.get_input_value(&PortRef::new(sink, "in")).unwrap(),
            Some(json!(2.0))
        );
    }

    #[test]
    fn test_restore_prunes_dangling_edges() {
        let graph = sample();
        let mut snapshot = graph.snapshot();
        let ghost = NodeId::new();
        snapshot.nodes[0]
            .port_mut("value")
            .unwrap()
            .connections
            .push(PortConnection::new(ghost, "in"));

        let restored = NodeGraph::restore(snapshot, registry(), GraphConfig::default()).unwrap();
        let source = restored.nodes()[0].id;
        assert_eq!(restored.connections(&PortRef::new(source, "value")).len(), 1);
        assert_symmetric(&restored);
    }

    #[test]
    fn test_restore_closes_list_gap() {
        let mut graph = NodeGraph::new("gap", registry());
        let first = graph.add_node("constant").unwrap();
        let last = graph.add_node("constant").unwrap();
        let adder = graph.add_node("adder").unwrap();
        for _ in 0..3 {
            graph.add_list_element(adder, "terms").unwrap();
        }
        graph
            .connect(&PortRef::new(first, "value"), &PortRef::new(adder, "terms 0"))
            .unwrap();
        graph
            .connect(&PortRef::new(last, "value"), &PortRef::new(adder, "terms 2"))
            .unwrap();

        let mut snapshot = graph.snapshot();
        let node = snapshot.nodes.iter_mut().find(|n| n.id == adder).unwrap();
        node.ports.shift_remove("terms 1");

        let mut restored = NodeGraph::restore(snapshot, registry(), GraphConfig::default()).unwrap();
        assert_eq!(restored.list_len(adder, "terms").unwrap(), 2);
        assert!(restored.is_connected(&PortRef::new(last, "value"), &PortRef::new(adder, "terms 1")));
        assert_symmetric(&restored);

        let added = restored.add_list_element(adder, "terms").unwrap();
        assert_eq!(added.port, "terms 2");
        assert!(restored.connections(&added).is_empty());
        assert!(restored.is_connected(&PortRef::new(last, "value"), &PortRef::new(adder, "terms 1")));
        assert_symmetric(&restored);
        assert!(restored.verify().is_empty());
    }

    #[test]
    fn test_restore_initializes_nodes() {
        let mut graph = NodeGraph::new("counters", registry());
        let id = graph.add_node("counter").unwrap();

        let restored = NodeGraph::restore(graph.snapshot(), registry(), GraphConfig::default()).unwrap();
        assert_eq!(restored.node(id).unwrap().data_as::<u64>("initialized"), Some(2));
    }

    #[test]
    fn test_file_round_trip() {
        let graph = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        graph.snapshot().write_to(File::create(&path).unwrap()).unwrap();
        let snapshot = GraphSnapshot::read_from(File::open(&path).unwrap()).unwrap();
        assert_eq!(snapshot, graph.snapshot());
    }

    #[test]
    fn test_missing_variables_default_to_empty() {
        let json = r#"{"id": "g", "name": "empty", "nodes": []}"#;
        let snapshot = GraphSnapshot::from_json(json).unwrap();
        assert!(snapshot.variables.is_empty());
    }
}
