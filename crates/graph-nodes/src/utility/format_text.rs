//! Format Text Node
//!
//! Renders any value into a text template. Every `{}` in the template is
//! replaced with the input value; strings are inserted without quotes,
//! other values as JSON.

use std::sync::Arc;

use node_graph::{
    EvalContext, Node, NodeBehavior, NodeCategory, NodeDefinition, NodeDescriptor,
    PortDescriptor, Result, ValueType,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Persisted settings of a format-text node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Text with `{}` placeholders
    pub template: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            template: "{}".to_string(),
        }
    }
}

pub struct FormatText;

impl FormatText {
    pub const PORT_VALUE: &'static str = "value";
    pub const PORT_TEXT: &'static str = "text";

    fn behavior() -> Arc<dyn NodeBehavior> {
        Arc::new(Self)
    }

    fn render(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl NodeDescriptor for FormatText {
    fn definition() -> NodeDefinition {
        NodeDefinition::new("format-text", NodeCategory::Utility, "Format Text")
            .with_description("Renders a value into a text template")
            .with_input(PortDescriptor::input(Self::PORT_VALUE, "Value", ValueType::Any).single())
            .with_output(PortDescriptor::output(Self::PORT_TEXT, "Text", ValueType::String))
            .with_default_data(json!({ "template": "{}" }))
    }
}

inventory::submit!(node_graph::NodeTypeFn {
    definition: FormatText::definition,
    behavior: FormatText::behavior,
});

impl NodeBehavior for FormatText {
    fn compute_output(&self, node: &Node, _port: &str, ctx: &mut EvalContext<'_>) -> Result<Value> {
        let config: FormatConfig = serde_json::from_value(node.data.clone()).unwrap_or_default();
        let value = ctx.input_or(Self::PORT_VALUE, Value::Null)?;
        Ok(json!(config.template.replace("{}", &Self::render(&value))))
    }
}
