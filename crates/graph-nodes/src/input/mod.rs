//! Input nodes
//!
//! Nodes that provide values stored on the node itself.

mod constant;

pub use constant::{FloatConstant, IntConstant, TextConstant};
