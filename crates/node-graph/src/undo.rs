//! Undo/redo history of graph snapshots
//!
//! Each entry is a `GraphSnapshot` serialized to JSON and compressed with
//! zstd. Stepping back or forward yields the snapshot, which the caller
//! turns into a graph again with `NodeGraph::restore`.

use std::collections::VecDeque;

use crate::config::{GraphConfig, DEFAULT_UNDO_LIMIT};
use crate::error::{NodeGraphError, Result};
use crate::graph::NodeGraph;
use crate::snapshot::GraphSnapshot;

const COMPRESSION_LEVEL: i32 = 3;

/// Bounded history of compressed graph snapshots
pub struct UndoStack {
    entries: VecDeque<Vec<u8>>,
    /// Index of the entry matching the live graph
    cursor: usize,
    limit: usize,
}

impl UndoStack {
    /// Create a stack holding at most `limit` snapshots (at least one)
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Create a stack sized by `GraphConfig::undo_limit`
    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(config.undo_limit)
    }

    /// Record the current state of a graph
    ///
    /// Anything that could have been redone is discarded.
    pub fn push(&mut self, graph: &NodeGraph) -> Result<()> {
        let json = serde_json::to_vec(&graph.snapshot())?;
        let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| NodeGraphError::Compression(e.to_string()))?;

        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(compressed);

        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        Ok(())
    }

    /// Step back; `None` at the oldest snapshot
    pub fn undo(&mut self) -> Option<Result<GraphSnapshot>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.decode(self.cursor))
    }

    /// Step forward; `None` at the newest snapshot
    pub fn redo(&mut self) -> Option<Result<GraphSnapshot>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.decode(self.cursor))
    }

    /// The snapshot at the cursor
    pub fn current(&self) -> Option<Result<GraphSnapshot>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.decode(self.cursor))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Total bytes held by the compressed snapshots
    pub fn compressed_size(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    fn decode(&self, index: usize) -> Result<GraphSnapshot> {
        let compressed = self
            .entries
            .get(index)
            .ok_or_else(|| NodeGraphError::Compression(format!("no snapshot at {}", index)))?;
        let json = zstd::decode_all(compressed.as_slice())
            .map_err(|e| NodeGraphError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing;
    use crate::types::PortRef;

    fn graph(name: &str) -> NodeGraph {
        NodeGraph::new(name, Arc::new(testing::registry()))
    }

    #[test]
    fn test_undo_walks_back() {
        let mut stack = UndoStack::new(10);
        for name in ["first", "second", "third"] {
            stack.push(&graph(name)).unwrap();
        }

        assert_eq!(stack.current().unwrap().unwrap().name, "third");
        assert_eq!(stack.undo().unwrap().unwrap().name, "second");
        assert_eq!(stack.undo().unwrap().unwrap().name, "first");
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_redo_walks_forward() {
        let mut stack = UndoStack::new(10);
        stack.push(&graph("first")).unwrap();
        stack.push(&graph("second")).unwrap();

        stack.undo();
        assert_eq!(stack.redo().unwrap().unwrap().name, "second");
        assert!(stack.redo().is_none());
    }

    #[test]
    fn test_push_discards_redo_history() {
        let mut stack = UndoStack::new(10);
        stack.push(&graph("first")).unwrap();
        stack.push(&graph("second")).unwrap();
        stack.undo();

        stack.push(&graph("third")).unwrap();
        assert!(!stack.can_redo());
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.current().unwrap().unwrap().name, "third");
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut stack = UndoStack::new(3);
        for i in 0..5 {
            stack.push(&graph(&format!("graph_{}", i))).unwrap();
        }

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.current().unwrap().unwrap().name, "graph_4");
        stack.undo();
        assert_eq!(stack.undo().unwrap().unwrap().name, "graph_2");
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_undo_restores_edges() {
        let registry = Arc::new(testing::registry());
        let mut live = NodeGraph::new("live", registry.clone());
        let source = live.add_node("constant").unwrap();
        let sink = live.add_node("sink").unwrap();
        let mut stack = UndoStack::from_config(live.config());
        stack.push(&live).unwrap();

        live.connect(&PortRef::new(source, "value"), &PortRef::new(sink, "in"))
            .unwrap();
        stack.push(&live).unwrap();

        let before = stack.undo().unwrap().unwrap();
        let restored = NodeGraph::restore(before, registry, live.config().clone()).unwrap();
        assert!(!restored.is_connected(&PortRef::new(source, "value"), &PortRef::new(sink, "in")));
        assert!(stack.compressed_size() > 0);
    }
}
