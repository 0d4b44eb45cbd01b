//! Graph Nodes
//!
//! Built-in node types for the node-graph engine. Each type registers
//! itself at link time with `inventory::submit!`, so
//! `NodeRegistry::with_builtins()` picks up every type in this crate.
//!
//! # Categories
//!
//! - **Input**: constants stored on the node
//! - **Math**: arithmetic over float and numeric inputs
//! - **Utility**: passthrough and conversion

pub mod input;
pub mod math;
pub mod utility;

// Re-export all node types for convenience
pub use input::*;
pub use math::*;
pub use utility::*;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use node_graph::{
        GraphBuilder, GraphConfig, GraphEvent, NodeCategory, NodeGraph, NodeRegistry, PortRef,
        UndoStack, VecEventSink,
    };
    use serde_json::json;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(NodeRegistry::with_builtins())
    }

    #[test]
    fn test_inventory_collects_all_builtins() {
        let registry = NodeRegistry::with_builtins();
        assert_eq!(registry.all_definitions().len(), 8, "Expected 8 built-in nodes");

        for node_type in [
            "float-constant",
            "int-constant",
            "text-constant",
            "add",
            "multiply",
            "sum",
            "relay",
            "format-text",
        ] {
            assert!(registry.has_node_type(node_type), "missing {}", node_type);
        }

        let grouped = registry.definitions_by_category();
        assert_eq!(grouped.get(&NodeCategory::Input).map(Vec::len), Some(3));
        assert_eq!(grouped.get(&NodeCategory::Math).map(Vec::len), Some(3));
        assert_eq!(grouped.get(&NodeCategory::Utility).map(Vec::len), Some(2));
        assert!(registry.schema().definition_errors().is_empty());
    }

    #[test]
    fn test_end_to_end_evaluation() {
        init_logging();
        let graph = GraphBuilder::new(registry())
            .name("Pipeline")
            .add_node("a", "float-constant", (0.0, 0.0))
            .with_data(json!({ "value": 2.0 }))
            .add_node("b", "float-constant", (0.0, 100.0))
            .with_data(json!({ "value": 3.0 }))
            .add_node("add", "add", (200.0, 50.0))
            .list_elements("add", "terms", 2)
            .add_node("scale", "multiply", (400.0, 50.0))
            .with_data(json!({ "b": 10.0 }))
            .add_node("label", "format-text", (600.0, 50.0))
            .with_data(json!({ "template": "result = {}" }))
            .connect("a", "value", "add", "terms 0")
            .connect("b", "value", "add", "terms 1")
            .connect("add", "sum", "scale", "a")
            .connect("scale", "product", "label", "value")
            .build()
            .unwrap();

        let label = graph.find_node_by_name("label").unwrap().id;
        assert_eq!(
            graph.get_output_value(&PortRef::new(label, "text")).unwrap(),
            json!("result = 50.0")
        );
        assert!(graph.verify().is_empty());
    }

    #[test]
    fn test_removing_a_term_keeps_later_edges() {
        init_logging();
        let mut graph = GraphBuilder::new(registry())
            .add_node("one", "float-constant", (0.0, 0.0))
            .with_data(json!({ "value": 1.0 }))
            .add_node("two", "float-constant", (0.0, 0.0))
            .with_data(json!({ "value": 2.0 }))
            .add_node("four", "float-constant", (0.0, 0.0))
            .with_data(json!({ "value": 4.0 }))
            .add_node("add", "add", (0.0, 0.0))
            .list_elements("add", "terms", 3)
            .connect("one", "value", "add", "terms 0")
            .connect("two", "value", "add", "terms 1")
            .connect("four", "value", "add", "terms 2")
            .build()
            .unwrap();

        let add = graph.find_node_by_name("add").unwrap().id;
        let four = graph.find_node_by_name("four").unwrap().id;
        graph.remove_list_element(add, "terms", 1).unwrap();

        assert_eq!(graph.list_len(add, "terms").unwrap(), 2);
        assert!(graph.is_connected(&PortRef::new(four, "value"), &PortRef::new(add, "terms 1")));
        assert_eq!(graph.get_output_value(&PortRef::new(add, "sum")).unwrap(), json!(5.0));
    }

    #[test]
    fn test_snapshot_survives_schema_rename() {
        init_logging();
        let mut graph = NodeGraph::new("legacy", registry());
        let source = graph.add_node("float-constant").unwrap();
        let add = graph.add_node("add").unwrap();
        let sink = graph.add_node("relay").unwrap();
        graph.add_list_element(add, "terms").unwrap();
        graph
            .connect(&PortRef::new(source, "value"), &PortRef::new(add, "terms 0"))
            .unwrap();
        graph
            .connect(&PortRef::new(add, "sum"), &PortRef::new(sink, "in"))
            .unwrap();

        // Simulate a snapshot written when the output was still called "result"
        let mut snapshot = graph.snapshot();
        let json = snapshot
            .to_json()
            .unwrap()
            .replace("\"sum\"", "\"result\"");
        snapshot = node_graph::GraphSnapshot::from_json(&json).unwrap();

        let restored = NodeGraph::restore(snapshot, registry(), GraphConfig::default()).unwrap();

        assert!(restored.is_connected(&PortRef::new(add, "sum"), &PortRef::new(sink, "in")));
        assert!(restored.node(add).unwrap().port("result").is_none());
        assert!(restored.verify().is_empty());
    }

    #[test]
    fn test_undo_round_trip_through_builtins() {
        let registry = registry();
        let mut graph = NodeGraph::new("undo", registry.clone());
        let mut history = UndoStack::from_config(graph.config());
        history.push(&graph).unwrap();

        let relay = graph.add_node("relay").unwrap();
        history.push(&graph).unwrap();
        graph.remove_node(relay).unwrap();
        history.push(&graph).unwrap();

        let previous = history.undo().unwrap().unwrap();
        let graph = NodeGraph::restore(previous, registry, GraphConfig::default()).unwrap();
        assert!(graph.contains(relay));
    }

    #[test]
    fn test_removing_a_source_reports_edges() {
        let events = Arc::new(VecEventSink::new());
        let mut graph = GraphBuilder::new(registry())
            .event_sink(events.clone())
            .add_node("x", "float-constant", (0.0, 0.0))
            .add_node("total", "sum", (100.0, 0.0))
            .add_node("scale", "multiply", (100.0, 100.0))
            .connect("x", "value", "total", "values")
            .connect("x", "value", "scale", "a")
            .build()
            .unwrap();

        let x = graph.find_node_by_name("x").unwrap().id;
        events.clear();
        graph.remove_node(x).unwrap();

        let removed = events
            .events()
            .iter()
            .filter(|e| matches!(e, GraphEvent::ConnectionRemoved { .. }))
            .count();
        assert_eq!(removed, 2);
        assert!(matches!(events.events().last(), Some(GraphEvent::NodeRemoved { .. })));
        assert!(graph.verify().is_empty());
    }
}
