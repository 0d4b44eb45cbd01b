//! Pull evaluation of output values
//!
//! An output's value is computed by its node type's behavior, which pulls
//! its inputs through an `EvalContext`. The context walks edges upstream
//! depth-first without caching: every request recomputes.
//!
//! The context keeps the stack of outputs currently being computed. A
//! request for an output already on the stack is a cycle and fails with
//! `CycleDetected`; a stack deeper than `GraphConfig::eval_depth()` fails
//! with `DepthExceeded`. The bound is clamped to `MAX_EVAL_DEPTH_LIMIT`
//! because every level also nests native call frames.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::MAX_EVAL_DEPTH_LIMIT;
use crate::error::{NodeGraphError, Result};
use crate::graph::NodeGraph;
use crate::port::Port;
use crate::types::{PortDirection, PortRef};

/// State of one evaluation pass over a graph
pub struct EvalContext<'g> {
    graph: &'g NodeGraph,
    stack: Vec<PortRef>,
    max_depth: usize,
}

impl<'g> EvalContext<'g> {
    pub fn new(graph: &'g NodeGraph) -> Self {
        let config = graph.config();
        if config.max_eval_depth > MAX_EVAL_DEPTH_LIMIT {
            log::warn!(
                "Evaluation depth {} exceeds the limit; using {}",
                config.max_eval_depth,
                MAX_EVAL_DEPTH_LIMIT
            );
        }
        Self {
            graph,
            stack: Vec::new(),
            max_depth: config.eval_depth(),
        }
    }

    /// The graph being evaluated
    pub fn graph(&self) -> &'g NodeGraph {
        self.graph
    }

    /// Number of outputs currently being computed
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn port(&self, port: &PortRef, expected: PortDirection) -> Result<&'g Port> {
        let graph = self.graph;
        let node = graph.require_node(port.node)?;
        let found = node.port(&port.port).ok_or_else(|| NodeGraphError::PortNotFound {
            node: port.node,
            port: port.port.clone(),
        })?;
        if found.direction != expected {
            return Err(NodeGraphError::WrongDirection {
                port: port.clone(),
                expected,
            });
        }
        Ok(found)
    }

    fn describe(&self, port: &PortRef) -> String {
        match self.graph.node(port.node) {
            Some(node) => format!("{}.{}", node.name, port.port),
            None => port.to_string(),
        }
    }

    /// Compute the value of an output port
    pub fn output_value(&mut self, output: &PortRef) -> Result<Value> {
        if let Some(start) = self.stack.iter().position(|p| p == output) {
            let mut path: Vec<String> = self.stack[start..].iter().map(|p| self.describe(p)).collect();
            path.push(self.describe(output));
            return Err(NodeGraphError::CycleDetected { path });
        }
        if self.stack.len() >= self.max_depth {
            return Err(NodeGraphError::DepthExceeded(self.max_depth));
        }

        self.port(output, PortDirection::Output)?;
        let graph = self.graph;
        let node = graph.require_node(output.node)?;
        let behavior = graph
            .behavior(&node.node_type)
            .ok_or_else(|| NodeGraphError::UnknownNodeType(node.node_type.clone()))?;

        self.stack.push(output.clone());
        let result = behavior.compute_output(node, &output.port, self);
        self.stack.pop();
        result
    }

    /// Value of an input port's first edge, or `None` if it has no edges
    pub fn input_value_of(&mut self, input: &PortRef) -> Result<Option<Value>> {
        let port = self.port(input, PortDirection::Input)?;
        match port.connections.first() {
            Some(connection) => self.output_value(&connection.target()).map(Some),
            None => Ok(None),
        }
    }

    /// Values of every edge of an input port, in edge order
    pub fn input_values_of(&mut self, input: &PortRef) -> Result<Vec<Value>> {
        let port = self.port(input, PortDirection::Input)?;
        port.connections
            .iter()
            .map(|connection| self.output_value(&connection.target()))
            .collect()
    }

    // =========================================================================
    // Inputs of the node whose output is being computed
    // =========================================================================

    fn current(&self, port: &str) -> Result<PortRef> {
        self.stack
            .last()
            .map(|output| PortRef::new(output.node, port))
            .ok_or(NodeGraphError::NotEvaluating)
    }

    /// Value of one of the current node's inputs
    pub fn input(&mut self, port: &str) -> Result<Option<Value>> {
        let input = self.current(port)?;
        self.input_value_of(&input)
    }

    /// Values of every edge of one of the current node's inputs
    pub fn inputs(&mut self, port: &str) -> Result<Vec<Value>> {
        let input = self.current(port)?;
        self.input_values_of(&input)
    }

    /// Value of an input, or `fallback` if it has no edges
    pub fn input_or(&mut self, port: &str, fallback: Value) -> Result<Value> {
        Ok(self.input(port)?.unwrap_or(fallback))
    }

    /// Value of an input, deserialized
    pub fn input_as<T: DeserializeOwned>(&mut self, port: &str) -> Result<Option<T>> {
        let Some(value) = self.input(port)? else {
            return Ok(None);
        };
        let input = self.current(port)?;
        serde_json::from_value(value).map(Some).map_err(|e| {
            NodeGraphError::compute(input.node, port, format!("unexpected input value: {}", e))
        })
    }

    /// Values of every element of one of the current node's dynamic lists
    pub fn list_inputs(&mut self, list: &str) -> Result<Vec<Option<Value>>> {
        let current = self.current(list)?;
        let graph = self.graph;
        let node = graph.require_node(current.node)?;
        node.list_ports(list)
            .into_iter()
            .filter(|port| port.is_input())
            .map(|port| self.input_value_of(&port.port_ref()))
            .collect()
    }
}

impl NodeGraph {
    /// A fresh evaluation context over this graph
    pub fn evaluator(&self) -> EvalContext<'_> {
        EvalContext::new(self)
    }

    /// Compute the value of an output port
    pub fn get_output_value(&self, output: &PortRef) -> Result<Value> {
        self.evaluator().output_value(output)
    }

    /// Value of an input port's first edge, or `None` if it has no edges
    pub fn get_input_value(&self, input: &PortRef) -> Result<Option<Value>> {
        self.evaluator().input_value_of(input)
    }

    /// Value of an input port, or `fallback` if it has no edges
    pub fn get_input_value_or(&self, input: &PortRef, fallback: Value) -> Result<Value> {
        Ok(self.get_input_value(input)?.unwrap_or(fallback))
    }

    /// Values of every edge of an input port, in edge order
    pub fn get_input_values(&self, input: &PortRef) -> Result<Vec<Value>> {
        self.evaluator().input_values_of(input)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::GraphConfig;
    use crate::testing;
    use crate::types::NodeId;
    use serde_json::json;

    fn graph() -> NodeGraph {
        NodeGraph::new("test", Arc::new(testing::registry()))
    }

    fn constant(graph: &mut NodeGraph, value: f64) -> NodeId {
        let id = graph.add_node("constant").unwrap();
        graph.node_mut(id).unwrap().set_data_field("value", json!(value));
        id
    }

    #[test]
    fn test_output_value_pulls_through_inputs() {
        let mut graph = graph();
        let a = constant(&mut graph, 1.5);
        let b = constant(&mut graph, 2.0);
        let adder = graph.add_node("adder").unwrap();
        let first = graph.add_list_element(adder, "terms").unwrap();
        let second = graph.add_list_element(adder, "terms").unwrap();
        graph.add_list_element(adder, "terms").unwrap();
        graph.connect(&PortRef::new(a, "value"), &first).unwrap();
        graph.connect(&PortRef::new(b, "value"), &second).unwrap();

        let sum = graph.get_output_value(&PortRef::new(adder, "sum")).unwrap();
        assert_eq!(sum, json!(3.5));
    }

    #[test]
    fn test_unconnected_input() {
        let mut graph = graph();
        let sink = graph.add_node("sink").unwrap();
        let input = PortRef::new(sink, "in");

        assert_eq!(graph.get_input_value(&input).unwrap(), None);
        assert_eq!(graph.get_input_value_or(&input, json!(7)).unwrap(), json!(7));
        assert!(graph.get_input_values(&input).unwrap().is_empty());
    }

    #[test]
    fn test_input_values_in_edge_order() {
        let mut graph = graph();
        let a = constant(&mut graph, 1.0);
        let b = constant(&mut graph, 2.0);
        let sink = graph.add_node("sink").unwrap();
        let input = PortRef::new(sink, "in");
        graph.connect(&PortRef::new(b, "value"), &input).unwrap();
        graph.connect(&PortRef::new(a, "value"), &input).unwrap();

        assert_eq!(graph.get_input_values(&input).unwrap(), vec![json!(2.0), json!(1.0)]);
        assert_eq!(graph.get_input_value(&input).unwrap(), Some(json!(2.0)));
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut graph = graph();
        let a = graph.add_node("relay").unwrap();
        let b = graph.add_node("relay").unwrap();
        graph.rename_node(a, "A").unwrap();
        graph.rename_node(b, "B").unwrap();
        graph.connect(&PortRef::new(a, "out"), &PortRef::new(b, "in")).unwrap();
        graph.connect(&PortRef::new(b, "out"), &PortRef::new(a, "in")).unwrap();

        match graph.get_output_value(&PortRef::new(a, "out")) {
            Err(NodeGraphError::CycleDetected { path }) => {
                assert_eq!(path, vec!["A.out", "B.out", "A.out"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut graph = graph().with_config(GraphConfig {
            max_eval_depth: 3,
            ..GraphConfig::default()
        });
        let source = constant(&mut graph, 1.0);
        let mut previous = PortRef::new(source, "value");
        for _ in 0..3 {
            let relay = graph.add_node("relay").unwrap();
            graph.connect(&previous, &PortRef::new(relay, "in")).unwrap();
            previous = PortRef::new(relay, "out");
        }

        assert!(matches!(
            graph.get_output_value(&previous),
            Err(NodeGraphError::DepthExceeded(3))
        ));
    }

    #[test]
    fn test_oversized_depth_bound_is_clamped() {
        let mut graph = graph().with_config(GraphConfig {
            max_eval_depth: usize::MAX,
            ..GraphConfig::default()
        });
        let source = constant(&mut graph, 1.0);
        let mut previous = PortRef::new(source, "value");
        for _ in 0..MAX_EVAL_DEPTH_LIMIT {
            let relay = graph.add_node("relay").unwrap();
            graph.connect(&previous, &PortRef::new(relay, "in")).unwrap();
            previous = PortRef::new(relay, "out");
        }

        assert!(matches!(
            graph.get_output_value(&previous),
            Err(NodeGraphError::DepthExceeded(MAX_EVAL_DEPTH_LIMIT))
        ));
    }

    #[test]
    fn test_wrong_direction() {
        let mut graph = graph();
        let sink = graph.add_node("sink").unwrap();
        let source = constant(&mut graph, 1.0);

        assert!(matches!(
            graph.get_output_value(&PortRef::new(sink, "in")),
            Err(NodeGraphError::WrongDirection { .. })
        ));
        assert!(matches!(
            graph.get_input_value(&PortRef::new(source, "value")),
            Err(NodeGraphError::WrongDirection { .. })
        ));
    }

    #[test]
    fn test_inputs_outside_evaluation() {
        let graph = graph();
        let mut ctx = graph.evaluator();
        assert!(matches!(ctx.input("in"), Err(NodeGraphError::NotEvaluating)));
        assert_eq!(ctx.depth(), 0);
    }
}
