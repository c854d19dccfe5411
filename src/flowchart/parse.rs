//! Line parser for model-generated edge lists.
//!
//! Each useful line has the shape
//! `Node "X" to Node "Y" with edge "Z"`; the label clause is optional and
//! matching is case-insensitive. The older coordinate form
//! (`Node "X" at x: 10 y: 20 to Node "Y" at x: 10 y: 120 ...`) is accepted
//! too, with coordinates discarded. Anything else is dropped.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const EDGE_PATTERN: &str = concat!(
    r#"(?i)node\s+"([^"]+)""#,
    r"(?:\s+at\s+x:\s*-?\d+(?:\.\d+)?\s+y:\s*-?\d+(?:\.\d+)?)?",
    r#"\s+to\s+node\s+"([^"]+)""#,
    r"(?:\s+at\s+x:\s*-?\d+(?:\.\d+)?\s+y:\s*-?\d+(?:\.\d+)?)?",
    r#"(?:\s+with\s+edge\s+"([^"]*)")?"#,
);

/// One directed edge pulled out of the model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEdge {
    pub from: String,
    pub to: String,
    pub label: String,
}

fn edge_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EDGE_PATTERN).expect("edge pattern is a valid regex"))
}

/// Parse a whole response, keeping matching lines in order.
#[must_use]
pub fn parse_edges(text: &str) -> Vec<ExtractedEdge> {
    text.lines().filter_map(parse_line).collect()
}

/// Parse a single line. Returns `None` when the line doesn't describe an edge.
#[must_use]
pub fn parse_line(line: &str) -> Option<ExtractedEdge> {
    let caps = edge_pattern().captures(line.trim())?;
    let from = caps.get(1)?.as_str().trim();
    let to = caps.get(2)?.as_str().trim();
    if from.is_empty() || to.is_empty() {
        return None;
    }
    let label = caps.get(3).map_or("", |m| m.as_str().trim());
    Some(ExtractedEdge { from: from.to_owned(), to: to.to_owned(), label: label.to_owned() })
}

/// Node names in order of first appearance.
#[must_use]
pub fn node_names(edges: &[ExtractedEdge]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for edge in edges {
        for name in [&edge.from, &edge.to] {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// `(from, to)` pairs in extraction order, as the layout engine takes them.
#[must_use]
pub fn edge_pairs(edges: &[ExtractedEdge]) -> Vec<(String, String)> {
    edges.iter().map(|e| (e.from.clone(), e.to.clone())).collect()
}
