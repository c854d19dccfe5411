//! Flowchart parsing and layout.
//!
//! Parses model-generated `Node "X" to Node "Y" with edge "Z"` lines into
//! extracted edges and lays the resulting graph out as a tree-biased
//! flowchart, ready to be merged into the diagram store.

pub mod graph;
pub mod layout;
pub mod parse;

pub use graph::{FlowGraph, LayoutError};
pub use layout::{LayoutConfig, MergePlacement, Position, PositionMap, compute_positions};
pub use parse::{ExtractedEdge, parse_edges};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
