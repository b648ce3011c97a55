//! Textual flow diagrams.
//!
//! - [`palette`]: reading colours
//! - [`graph`]: graph construction and forest checks
//! - [`dot`]: DOT serialization for the renderer

pub mod dot;
pub mod graph;
pub mod palette;

pub use dot::to_dot;
pub use graph::{caption, FlowGraph, FlowGraphBuilder, FlowNode, ForestError};
pub use palette::{darken, fill_color, NodeStyle, DEFAULT_FILL, PALETTE};
