//! Fluent builder for node graphs
//!
//! Steps are recorded and replayed against a fresh graph in `build`, so
//! every node goes through the normal add path (default data, port
//! reconciliation, initialize hook) and every edge through `connect`.

use std::sync::Arc;

use serde_json::Value;

use crate::config::GraphConfig;
use crate::error::{NodeGraphError, Result};
use crate::events::EventSink;
use crate::graph::NodeGraph;
use crate::registry::NodeRegistry;
use crate::types::{NodeId, Point, PortRef, ValueType};

enum Step {
    AddNode {
        name: String,
        node_type: String,
        position: Point,
        data: Option<Value>,
    },
    ListElements {
        node: String,
        list: String,
        count: usize,
    },
    Connect {
        output: (String, String),
        input: (String, String),
    },
    Variable {
        id: String,
        value_type: ValueType,
        value: Value,
    },
}

/// Fluent builder for constructing node graphs
///
/// Nodes are referred to by the display names given to `add_node`.
///
/// # Example
///
/// ```ignore
/// let graph = GraphBuilder::new(registry)
///     .name("Sum")
///     .add_node("a", "float-constant", (0.0, 0.0))
///     .with_data(json!({"value": 2.0}))
///     .add_node("add", "add", (200.0, 0.0))
///     .list_elements("add", "terms", 2)
///     .connect("a", "value", "add", "terms 0")
///     .build()?;
/// ```
pub struct GraphBuilder {
    registry: Arc<NodeRegistry>,
    name: String,
    config: GraphConfig,
    events: Option<Arc<dyn EventSink>>,
    steps: Vec<Step>,
}

impl GraphBuilder {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            name: "Untitled".to_string(),
            config: GraphConfig::default(),
            events: None,
            steps: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Add a node of a registered type
    pub fn add_node(
        mut self,
        name: impl Into<String>,
        node_type: impl Into<String>,
        position: impl Into<Point>,
    ) -> Self {
        self.steps.push(Step::AddNode {
            name: name.into(),
            node_type: node_type.into(),
            position: position.into(),
            data: None,
        });
        self
    }

    /// Set data on the most recently added node
    ///
    /// Must be called immediately after `add_node`. Object fields are laid
    /// over the type's default data.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Some(Step::AddNode { data: slot, .. }) = self.steps.last_mut() {
            *slot = Some(data);
        }
        self
    }

    /// Append `count` elements to a node's dynamic port list
    pub fn list_elements(mut self, node: impl Into<String>, list: impl Into<String>, count: usize) -> Self {
        self.steps.push(Step::ListElements {
            node: node.into(),
            list: list.into(),
            count,
        });
        self
    }

    /// Connect an output port to an input port
    pub fn connect(
        mut self,
        output_node: impl Into<String>,
        output_port: impl Into<String>,
        input_node: impl Into<String>,
        input_port: impl Into<String>,
    ) -> Self {
        self.steps.push(Step::Connect {
            output: (output_node.into(), output_port.into()),
            input: (input_node.into(), input_port.into()),
        });
        self
    }

    pub fn variable(mut self, id: impl Into<String>, value_type: ValueType, value: Value) -> Self {
        self.steps.push(Step::Variable {
            id: id.into(),
            value_type,
            value,
        });
        self
    }

    /// Replay every step; the first failing step aborts the build
    pub fn build(self) -> Result<NodeGraph> {
        let mut graph = NodeGraph::new(self.name, self.registry).with_config(self.config);
        if let Some(events) = self.events {
            graph = graph.with_event_sink(events);
        }

        let mut names: Vec<(String, NodeId)> = Vec::new();
        let lookup = |names: &[(String, NodeId)], name: &str| {
            names
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, id)| *id)
                .ok_or_else(|| NodeGraphError::UnknownNodeName(name.to_string()))
        };

        for step in self.steps {
            match step {
                Step::AddNode {
                    name,
                    node_type,
                    position,
                    data,
                } => {
                    let id = graph.add_node_with(&node_type, Some(&name), position, data)?;
                    names.push((name, id));
                }
                Step::ListElements { node, list, count } => {
                    let id = lookup(&names, &node)?;
                    for _ in 0..count {
                        graph.add_list_element(id, &list)?;
                    }
                }
                Step::Connect { output, input } => {
                    let output = PortRef::new(lookup(&names, &output.0)?, output.1);
                    let input = PortRef::new(lookup(&names, &input.0)?, input.1);
                    graph.connect(&output, &input)?;
                }
                Step::Variable {
                    id,
                    value_type,
                    value,
                } => graph.set_variable(id, value_type, value),
            }
        }

        Ok(graph)
    }
}
