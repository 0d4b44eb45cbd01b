//! Utility nodes
//!
//! Passthrough and conversion nodes.

mod format_text;
mod relay;

pub use format_text::{FormatConfig, FormatText};
pub use relay::Relay;
