//! Relay Node
//!
//! Passes its input through unchanged. Useful as a routing point for long
//! edges, and as the simplest node that can take part in a cycle.

use std::sync::Arc;

use node_graph::{
    EvalContext, Node, NodeBehavior, NodeCategory, NodeDefinition, NodeDescriptor,
    PortDescriptor, Result, ValueType,
};
use serde_json::Value;

pub struct Relay;

impl Relay {
    pub const PORT_IN: &'static str = "in";
    pub const PORT_OUT: &'static str = "out";

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }
}

impl NodeDescriptor for Relay {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("relay", NodeCategory::Utility, "Relay")
            .with_description("Passes a value through unchanged")
            .with_input(PortDescriptor::input(Self::PORT_IN, "In", ValueType::Any).single())
            .with_output(PortDescriptor::output(Self::PORT_OUT, "Out", ValueType::Any))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: Relay::definition,
    behavior: Relay::behavior,
});

impl NodeBehavior for Relay {
    fn compute_output(&self, _node: &Node, _port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        ctx.input_or(Self::PORT_IN, Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_graph::{NodeGraph, NodeGraphError, NodeRegistry, PortRef};
    use serde_json::json;

    fn graph() -> NodeGraph {
        NodeGraph::new("relay", Arc::new(NodeRegistry::with_builtins()))
    }

    #[test]
    fn test_passes_value_through() {
        let mut graph = graph();
        let text = graph
            .add_node_with("text-constant", None, Default::default(), Some(json!({ "value": "hi" })))
            .unwrap();
        let relay = graph.add_node("relay").unwrap();
        graph
            .connect(&PortRef::new(text, "value"), &PortRef::new(relay, "in"))
            .unwrap();

        assert_eq!(graph.get_output_value(&PortRef::new(relay, "out")).unwrap(), json!("hi"));
    }

    #[test]
    fn test_unconnected_is_null() {
        let mut graph = graph();
        let relay = graph.add_node("relay").unwrap();
        assert_eq!(graph.get_output_value(&PortRef::new(relay, "out")).unwrap(), Value::Null);
    }

    #[test]
    fn test_loop_is_detected() {
        let mut graph = graph();
        let relay = graph.add_node("relay").unwrap();
        graph
            .connect(&PortRef::new(relay, "out"), &PortRef::new(relay, "in"))
            .unwrap();

        assert!(matches!(
            graph.get_output_value(&PortRef::new(relay, "out")),
            Err(NodeGraphError::CycleDetected { .. })
        ));
    }
}
