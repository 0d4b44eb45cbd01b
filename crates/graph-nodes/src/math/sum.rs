//! Sum Node
//!
//! Reduces every edge of a single multi-edge input. Unlike `add`, the
//! terms are not separate ports: any number of numeric outputs connect to
//! the same `values` port and are summed in edge order.

use std::sync::Arc;

use node_graph::{
    EvalContext, Node, NodeBehavior, NodeCategory, NodeDefinition, NodeDescriptor,
    NodeGraphError, PortDescriptor, Result, ValueType,
};
use serde_json::{json, Value};

pub struct Sum;

impl Sum {
    pub const PORT_VALUES: &'static str = "values";
    pub const PORT_TOTAL: &'static str = "total";

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }
}

impl NodeDescriptor for Sum {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("sum", NodeCategory::Math, "Sum")
            .with_description("Sums every value connected to its input")
            .with_input(
                PortDescriptor::input(Self::PORT_VALUES, "Values", ValueType::Number)
                    .multiple()
                    .inherited(),
            )
            .with_output(PortDescriptor::output(Self::PORT_TOTAL, "Total", ValueType::Float))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: Sum::definition,
    behavior: Sum::behavior,
});

impl NodeBehavior for Sum {
    fn compute_output(&self, node: &Node, port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        let values = ctx.inputs(Self::PORT_VALUES)?;
        let total = values.iter().try_fold(0.0, |total, value| {
            value
                .as_f64()
                .map(|v| total + v)
                .ok_or_else(|| NodeGraphError::compute(node.id, port, format!("{} is not a number", value)))
        })?;
        Ok(json!(total))
    }
}
