//! Node types shared by the unit tests of this crate

use std::sync::Arc;

use serde_json::{json, Value};

use crate::descriptor::{NodeDefinition, PortDescriptor};
use crate::error::Result;
use crate::eval::EvalContext;
use crate::node::Node;
use crate::registry::{NodeBehavior, NodeRegistry};
use crate::types::{NodeCategory, PortRef, ValueType};

/// Outputs the `value` data field
pub struct Constant;

impl NodeBehavior for Constant {
    fn compute_output(&self, node: &Node, _port: &str, _ctx: &mut EvalContext<'_>) -> Result<Value> {
        Ok(node.data_field("value").cloned().unwrap_or(Value::Null))
    }
}

/// Sums a dynamic list of float terms
pub struct Adder;

impl NodeBehavior for Adder {
    fn compute_output(&self, _node: &Node, _port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        let mut total = 0.0;
        for value in ctx.list_inputs("terms")?.into_iter().flatten() {
            total += value.as_f64().unwrap_or(0.0);
        }
        Ok(json!(total))
    }
}

/// Passes its input through unchanged
pub struct Relay;

impl NodeBehavior for Relay {
    fn compute_output(&self, _node: &Node, _port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        ctx.input_or("in", Value::Null)
    }
}

/// Counts connection hooks in its data
pub struct Counter;

impl NodeBehavior for Counter {
    fn initialize(&self, node: &mut Node) {
        let count = node.data_as::<u64>("initialized").unwrap_or(0);
        node.set_data_field("initialized", json!(count + 1));
    }

    fn on_connection_created(&self, node: &mut Node, _port: &str, _remote: &PortRef) {
        let count = node.data_as::<u64>("created").unwrap_or(0);
        node.set_data_field("created", json!(count + 1));
    }

    fn on_connection_removed(&self, node: &mut Node, _port: &str, _remote: &PortRef) {
        let count = node.data_as::<u64>("removed").unwrap_or(0);
        node.set_data_field("removed", json!(count + 1));
    }
}

pub fn constant_definition() -> NodeDefinition {
    NodeDefinition::new("constant", NodeCategory::Input, "Constant")
        .with_output(PortDescriptor::output("value", "Value", ValueType::Float))
        .with_default_data(json!({ "value": 0.0 }))
}

pub fn adder_definition() -> NodeDefinition {
    NodeDefinition::new("adder", NodeCategory::Math, "Adder")
        .with_input(
            PortDescriptor::input("terms", "Terms", ValueType::Float)
                .single()
                .inherited()
                .dynamic_list(),
        )
        .with_output(PortDescriptor::output("sum", "Sum", ValueType::Float))
}

pub fn sink_definition() -> NodeDefinition {
    NodeDefinition::new("sink", NodeCategory::Utility, "Sink")
        .with_input(PortDescriptor::input("in", "In", ValueType::Float).inherited())
}

pub fn int_sink_definition() -> NodeDefinition {
    NodeDefinition::new("int-sink", NodeCategory::Utility, "Int Sink")
        .with_input(PortDescriptor::input("in", "In", ValueType::Int).single().strict())
}

pub fn relay_definition() -> NodeDefinition {
    NodeDefinition::new("relay", NodeCategory::Utility, "Relay")
        .with_input(PortDescriptor::input("in", "In", ValueType::Any).single())
        .with_output(PortDescriptor::output("out", "Out", ValueType::Any))
}

pub fn counter_definition() -> NodeDefinition {
    NodeDefinition::new("counter", NodeCategory::Custom, "Counter")
        .with_input(PortDescriptor::input("in", "In", ValueType::Any))
        .with_output(PortDescriptor::output("out", "Out", ValueType::Any))
}

/// A registry holding every test node type
pub fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(constant_definition(), Arc::new(Constant));
    registry.register(adder_definition(), Arc::new(Adder));
    registry.register_definition(sink_definition());
    registry.register_definition(int_sink_definition());
    registry.register(relay_definition(), Arc::new(Relay));
    registry.register(counter_definition(), Arc::new(Counter));
    registry
}

/// Route `log` output to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Assert that every edge in the graph is stored on both of its endpoints
pub fn assert_symmetric(graph: &crate::graph::NodeGraph) {
    for node in graph.nodes() {
        for port in node.ports.values() {
            for connection in &port.connections {
                let remote = graph
                    .port(&connection.target())
                    .unwrap_or_else(|| panic!("dangling edge {} -> {}", port.port_ref(), connection.target()));
                assert!(
                    remote.is_connected_to(&port.port_ref()),
                    "edge {} -> {} has no mirror",
                    port.port_ref(),
                    connection.target()
                );
                assert_ne!(remote.direction, port.direction);
            }
        }
    }
}
