//! Add Node
//!
//! Sums a dynamic list of terms. The editor grows and shrinks the list with
//! `add_list_element` / `remove_list_element`; each element is its own
//! single-edge input port named `"terms {index}"`.

use std::sync::Arc;

use node_graph::{
    EvalContext, Node, NodeBehavior, NodeCategory, NodeDefinition, NodeDescriptor,
    NodeGraphError, PortDescriptor, Result, ValueType,
};
use serde_json::{json, Value};

/// Add Node
///
/// # Inputs
/// - `terms {n}` (dynamic list) - float terms; an unconnected element uses
///   the matching entry of the `terms` data array, or 0
///
/// # Outputs
/// - `sum` - the sum of all terms
pub struct Add;

impl Add {
    /// Dynamic list of term inputs
    pub const PORT_TERMS: &'static str = "terms";
    /// Port ID for the sum output
    pub const PORT_SUM: &'static str = "sum";

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }
}

impl NodeDescriptor for Add {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("add", NodeCategory::Math, "Add")
            .with_description("Adds any number of float terms")
            .with_input(
                PortDescriptor::input(Self::PORT_TERMS, "Terms", ValueType::Float)
                    .single()
                    .inherited()
                    .dynamic_list(),
            )
            .with_output(PortDescriptor::output(Self::PORT_SUM, "Sum", ValueType::Float).formerly("result"))
            .with_default_data(json!({ "terms": [] }))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: Add::definition,
    behavior: Add::behavior,
});

impl NodeBehavior for Add {
    fn compute_output(&self, node: &Node, port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        let stored = node.data_field(Self::PORT_TERMS).and_then(Value::as_array);

        let mut sum = 0.0;
        for (index, input) in ctx.list_inputs(Self::PORT_TERMS)?.into_iter().enumerate() {
            let term = match input {
                Some(value) => value.as_f64().ok_or_else(|| {
                    NodeGraphError::compute(node.id, port, format!("term {} is not a number", index))
                })?,
                None => stored
                    .and_then(|terms| terms.get(index))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
            };
            sum += term;
        }

        log::debug!("Add '{}' summed to {}", node.name, sum);
        Ok(json!(sum))
    }
}
