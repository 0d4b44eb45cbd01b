//! Constant Nodes
//!
//! Source nodes that output a value stored in their node data. Editing the
//! constant means editing the node's `value` data field.

use std::sync::Arc;

use node_graph::{
    EvalContext, Node, NodeBehavior, NodeCategory, NodeDefinition, NodeDescriptor,
    NodeGraphError, PortDescriptor, Result, ValueType,
};
use serde_json::{json, Value};

/// Data field and output port shared by every constant
const VALUE: &str = "value";

fn stored_value(node: &Node) -> Option<&Value> {
    node.data_field(VALUE)
}

/// Float Constant
///
/// # Outputs
/// - `value` - the stored float
pub struct FloatConstant;

impl FloatConstant {
    /// Port ID for the value output
    pub const PORT_VALUE: &'static str = VALUE;

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }
}

impl NodeDescriptor for FloatConstant {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("float-constant", NodeCategory::Input, "Float")
            .with_description("Outputs a constant float")
            .with_output(PortDescriptor::output(Self::PORT_VALUE, "Value", ValueType::Float))
            .with_default_data(json!({ "value": 0.0 }))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: FloatConstant::definition,
    behavior: FloatConstant::behavior,
});

impl NodeBehavior for FloatConstant {
    fn compute_output(&self, node: &Node, port: &str, _ctx: &mut EvalContext<'_>) -> Result<Value> {
        let value = stored_value(node)
            .and_then(Value::as_f64)
            .ok_or_else(|| NodeGraphError::compute(node.id, port, "stored value is not a number"))?;
        Ok(json!(value))
    }
}

/// Integer Constant
///
/// # Outputs
/// - `value` - the stored integer
pub struct IntConstant;

impl IntConstant {
    /// Port ID for the value output
    pub const PORT_VALUE: &'static str = VALUE;

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }
}

impl NodeDescriptor for IntConstant {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("int-constant", NodeCategory::Input, "Integer")
            .with_description("Outputs a constant integer")
            .with_output(PortDescriptor::output(Self::PORT_VALUE, "Value", ValueType::Int))
            .with_default_data(json!({ "value": 0 }))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: IntConstant::definition,
    behavior: IntConstant::behavior,
});

impl NodeBehavior for IntConstant {
    fn compute_output(&self, node: &Node, port: &str, _ctx: &mut EvalContext<'_>) -> Result<Value> {
        let value = stored_value(node)
            .and_then(Value::as_i64)
            .ok_or_else(|| NodeGraphError::compute(node.id, port, "stored value is not an integer"))?;
        Ok(json!(value))
    }
}

/// Text Constant
///
/// # Outputs
/// - `value` - the stored text (empty if unset)
pub struct TextConstant;

impl TextConstant {
    /// Port ID for the value output
    pub const PORT_VALUE: &'static str = VALUE;

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }
}

impl NodeDescriptor for TextConstant {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("text-constant", NodeCategory::Input, "Text")
            .with_description("Outputs a constant string")
            .with_output(PortDescriptor::output(Self::PORT_VALUE, "Text", ValueType::String))
            .with_default_data(json!({ "value": "" }))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: TextConstant::definition,
    behavior: TextConstant::behavior,
});

impl NodeBehavior for TextConstant {
    fn compute_output(&self, node: &Node, _port: &str, _ctx: &mut EvalContext<'_>) -> Result<Value> {
        let text = stored_value(node).and_then(Value::as_str).unwrap_or_default();
        Ok(json!(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_graph::{NodeGraph, NodeRegistry, PortRef};

    fn graph() -> NodeGraph {
        NodeGraph::new("constants", Arc::new(NodeRegistry::with_builtins()))
    }

    #[test]
    fn test_descriptor() {
        let definition = FloatConstant::definition();
        assert_eq!(definition.node_type, "float-constant");
        assert_eq!(definition.category, NodeCategory::Input);
        assert!(definition.inputs.is_empty());
        assert_eq!(definition.outputs.len(), 1);
        assert_eq!(definition.outputs[0].value_type, ValueType::Float);
    }

    #[test]
    fn test_default_values() {
        let mut graph = graph();
        let float = graph.add_node("float-constant").unwrap();
        let int = graph.add_node("int-constant").unwrap();
        let text = graph.add_node("text-constant").unwrap();

        assert_eq!(graph.get_output_value(&PortRef::new(float, "value")).unwrap(), json!(0.0));
        assert_eq!(graph.get_output_value(&PortRef::new(int, "value")).unwrap(), json!(0));
        assert_eq!(graph.get_output_value(&PortRef::new(text, "value")).unwrap(), json!(""));
    }

    #[test]
    fn test_stored_value() {
        let mut graph = graph();
        let id = graph
            .add_node_with("int-constant", None, Default::default(), Some(json!({ "value": 42 })))
            .unwrap();
        assert_eq!(graph.get_output_value(&PortRef::new(id, "value")).unwrap(), json!(42));
    }

    #[test]
    fn test_wrong_stored_type_fails() {
        let mut graph = graph();
        let id = graph.add_node("float-constant").unwrap();
        graph.node_mut(id).unwrap().set_data_field("value", json!("nope"));

        assert!(matches!(
            graph.get_output_value(&PortRef::new(id, "value")),
            Err(NodeGraphError::ComputeFailed { .. })
        ));
    }
}
