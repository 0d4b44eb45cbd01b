//! Multiply Node
//!
//! Multiplies two floats. Both inputs are strict: only exact `Float`
//! outputs may connect.

use std::sync::Arc;

use node_graph::{
    EvalContext, Node, NodeBehavior, NodeCategory, NodeDefinition, NodeDescriptor,
    PortDescriptor, Result, ValueType,
};
use serde_json::{json, Value};

/// Multiply Node
///
/// # Inputs
/// - `a` - first factor; falls back to the `a` data field
/// - `b` - second factor; falls back to the `b` data field
///
/// # Outputs
/// - `product` - `a * b`
pub struct Multiply;

impl Multiply {
    pub const PORT_A: &'static str = "a";
    pub const PORT_B: &'static str = "b";
    pub const PORT_PRODUCT: &'static str = "product";

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }

    fn factor(node: &Node, port: &str, ctx: &mut EvalContext<'_>) -> Result<f64> {
        match ctx.input_as::<f64>(port)? {
            Some(value) => Ok(value),
            None => Ok(node.data_as::<f64>(port).unwrap_or(1.0)),
        }
    }
}

impl NodeDescriptor for Multiply {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("multiply", NodeCategory::Math, "Multiply")
            .with_description("Multiplies two floats")
            .with_input(PortDescriptor::input(Self::PORT_A, "A", ValueType::Float).single().strict())
            .with_input(PortDescriptor::input(Self::PORT_B, "B", ValueType::Float).single().strict())
            .with_output(PortDescriptor::output(Self::PORT_PRODUCT, "Product", ValueType::Float))
            .with_default_data(json!({ "a": 1.0, "b": 1.0 }))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: Multiply::definition,
    behavior: Multiply::behavior,
});

impl NodeBehavior for Multiply {
    fn compute_output(&self, node: &Node, _port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        let a = Self::factor(node, Self::PORT_A, ctx)?;
        let b = Self::factor(node, Self::PORT_B, ctx)?;
        Ok(json!(a * b))
    }
}
