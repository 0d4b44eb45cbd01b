//! Configuration for graph behavior

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default evaluation depth bound
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 256;

/// Hard ceiling on the evaluation depth bound
///
/// Each level of evaluation nests a few native call frames, so a larger
/// bound could exhaust a default 2 MiB thread stack before `DepthExceeded`
/// is reported.
pub const MAX_EVAL_DEPTH_LIMIT: usize = 512;

/// Default number of undo snapshots
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// Tunables of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Maximum number of nested outputs a single evaluation may walk through
    ///
    /// Values above `MAX_EVAL_DEPTH_LIMIT` are clamped to it.
    pub max_eval_depth: usize,
    /// Refuse connections that would close a dataflow cycle
    ///
    /// When off, cycles are only reported when an evaluation runs into one.
    pub reject_cycles: bool,
    /// Offset applied to the position of duplicated nodes
    pub duplicate_offset: (f64, f64),
    /// Maximum number of snapshots kept by an undo stack
    pub undo_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_eval_depth: DEFAULT_MAX_EVAL_DEPTH,
            reject_cycles: false,
            duplicate_offset: (30.0, 30.0),
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

impl GraphConfig {
    /// Evaluation depth bound actually applied
    pub fn eval_depth(&self) -> usize {
        self.max_eval_depth.min(MAX_EVAL_DEPTH_LIMIT)
    }

    /// Parse a config from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
