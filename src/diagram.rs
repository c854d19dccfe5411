//! Diagram store: the live, user-editable node and edge collections.
//!
//! DESIGN
//! ======
//! Nodes are keyed by their display name and edges by their ordered
//! `(source, target)` pair. Inserts are idempotent: a conflicting insert is
//! a no-op that reports `false`, so duplicate names and duplicate edges are
//! prevented by construction rather than raised. Deleting a node cascades
//! to every incident edge.
//!
//! The serialized shape matches what the browser diagram widget consumes,
//! and is also the persisted form.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::flowchart::{ExtractedEdge, Position, PositionMap};

/// Random placement range for nodes created without a position.
pub const RANDOM_PLACEMENT_EXTENT: f64 = 500.0;

pub const EDGE_MARKER_SIZE: u32 = 20;

/// Fill colors offered by the node editor.
pub const PALETTE_GREEN: &str = "#A8D5BA";
pub const PALETTE_YELLOW: &str = "#FDFD96";
pub const PALETTE_RED: &str = "#F4A8A8";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("edge not found: {0}")]
    EdgeNotFound(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl crate::error::ErrorCode for DiagramError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NodeNotFound(_) => "E_NODE_NOT_FOUND",
            Self::EdgeNotFound(_) => "E_EDGE_NOT_FOUND",
            Self::InvalidValue(_) => "E_INVALID_VALUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(rename = "backgroundColor", default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str, position: Position) -> Self {
        Self { id: name.to_owned(), position, data: NodeData { label: name.to_owned() }, style: None }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.data.label
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.style
            .as_ref()
            .and_then(|s| s.background_color.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEnd {
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    ArrowClosed,
}

impl Default for MarkerEnd {
    fn default() -> Self {
        Self { kind: MarkerKind::ArrowClosed, width: EDGE_MARKER_SIZE, height: EDGE_MARKER_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "markerEnd", default)]
    pub marker_end: MarkerEnd,
}

impl Edge {
    #[must_use]
    pub fn new(source: &str, target: &str, label: &str) -> Self {
        Self {
            id: edge_id(source, target),
            source: source.to_owned(),
            target: target.to_owned(),
            label: non_empty(label),
            marker_end: MarkerEnd::default(),
        }
    }
}

/// Preferred edge identifier for an ordered endpoint pair. Names may contain
/// `-`, so two pairs can want the same id; [`Diagram`] suffixes the later one.
#[must_use]
pub fn edge_id(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

fn non_empty(label: &str) -> Option<String> {
    if label.is_empty() { None } else { Some(label.to_owned()) }
}

/// An edge insert carrying optional positions for endpoints it may create.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInsert<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub label: &'a str,
    pub from_position: Option<Position>,
    pub to_position: Option<Position>,
}

/// What a layout merge actually added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub nodes_added: usize,
    pub edges_added: usize,
}

// =============================================================================
// DIAGRAM
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Diagram {
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// The edge for an ordered endpoint pair.
    #[must_use]
    pub fn edge_between(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    #[must_use]
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edge_between(source, target).is_some()
    }

    /// Push a new edge under an id no other edge holds.
    fn push_edge(&mut self, source: &str, target: &str, label: &str) {
        let mut edge = Edge::new(source, target, label);
        let mut n = 2;
        while self.edge(&edge.id).is_some() {
            edge.id = format!("{}#{n}", edge_id(source, target));
            n += 1;
        }
        self.edges.push(edge);
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, DiagramError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| DiagramError::NodeNotFound(id.to_owned()))
    }

    /// Insert a node. Returns `false` (and keeps the existing node) if the
    /// name is already taken.
    pub fn insert_node(&mut self, name: &str, position: Position) -> bool {
        if self.node(name).is_some() {
            return false;
        }
        self.nodes.push(Node::new(name, position));
        true
    }

    /// Insert an edge, creating missing endpoints first. Endpoints without a
    /// supplied position land at a random spot. Returns `false` if the
    /// directed pair already exists.
    pub fn insert_edge(&mut self, insert: &EdgeInsert<'_>, rng: &mut impl Rng) -> bool {
        for (name, position) in [(insert.from, insert.from_position), (insert.to, insert.to_position)] {
            if self.node(name).is_none() {
                let position = position.unwrap_or_else(|| random_position(rng));
                self.insert_node(name, position);
            }
        }

        if self.has_edge(insert.from, insert.to) {
            return false;
        }
        self.push_edge(insert.from, insert.to, insert.label);
        true
    }

    /// Connect two existing nodes, as a user drag between handles does.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if either endpoint is missing.
    pub fn connect(&mut self, source: &str, target: &str, label: &str) -> Result<bool, DiagramError> {
        for id in [source, target] {
            if self.node(id).is_none() {
                return Err(DiagramError::NodeNotFound(id.to_owned()));
            }
        }
        if self.has_edge(source, target) {
            return Ok(false);
        }
        self.push_edge(source, target, label);
        Ok(true)
    }

    /// Add a `"Node {n}"` placeholder at a random spot and return its name.
    pub fn add_untitled_node(&mut self, rng: &mut impl Rng) -> String {
        let mut n = self.nodes.len() + 1;
        let mut name = format!("Node {n}");
        while self.node(&name).is_some() {
            n += 1;
            name = format!("Node {n}");
        }
        let position = random_position(rng);
        self.insert_node(&name, position);
        name
    }

    /// Delete a node and every edge touching it.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges
            .retain(|e| e.source != id && e.target != id);
        true
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        self.edges.len() != before
    }

    /// Change a node's display label. The id stays the same.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn update_node_label(&mut self, id: &str, label: &str) -> Result<(), DiagramError> {
        self.node_mut(id)?.data.label = label.to_owned();
        Ok(())
    }

    /// Set a node's fill color.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for a blank color and `NodeNotFound` for an
    /// unknown id.
    pub fn update_node_color(&mut self, id: &str, color: &str) -> Result<(), DiagramError> {
        let color = color.trim();
        if color.is_empty() {
            return Err(DiagramError::InvalidValue("color must not be empty".into()));
        }
        let node = self.node_mut(id)?;
        node.style
            .get_or_insert_with(NodeStyle::default)
            .background_color = Some(color.to_owned());
        Ok(())
    }

    /// Move a node (drag on the canvas).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), DiagramError> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Change an edge label; an empty label clears it.
    ///
    /// # Errors
    ///
    /// Returns `EdgeNotFound` for an unknown id.
    pub fn update_edge_label(&mut self, id: &str, label: &str) -> Result<(), DiagramError> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DiagramError::EdgeNotFound(id.to_owned()))?;
        edge.label = non_empty(label);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Feed laid-out extracted edges into the store one by one. Existing
    /// nodes and edges are left untouched; endpoints the layout didn't
    /// position are placed randomly.
    pub fn merge_layout(
        &mut self,
        edges: &[ExtractedEdge],
        positions: &PositionMap,
        rng: &mut impl Rng,
    ) -> MergeSummary {
        let nodes_before = self.nodes.len();
        let mut edges_added = 0;
        for edge in edges {
            let insert = EdgeInsert {
                from: &edge.from,
                to: &edge.to,
                label: &edge.label,
                from_position: positions.get(&edge.from).copied(),
                to_position: positions.get(&edge.to).copied(),
            };
            if self.insert_edge(&insert, rng) {
                edges_added += 1;
            }
        }
        MergeSummary { nodes_added: self.nodes.len() - nodes_before, edges_added }
    }
}

/// Validate a user-supplied node name.
///
/// # Errors
///
/// Returns `InvalidValue` if the name is blank.
pub fn validate_name(name: &str) -> Result<&str, DiagramError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DiagramError::InvalidValue("node name must not be empty".into()));
    }
    Ok(name)
}

/// Uniform random spot in `[0, RANDOM_PLACEMENT_EXTENT)` on both axes.
pub fn random_position(rng: &mut impl Rng) -> Position {
    Position::new(
        rng.random_range(0.0..RANDOM_PLACEMENT_EXTENT),
        rng.random_range(0.0..RANDOM_PLACEMENT_EXTENT),
    )
}

#[cfg(test)]
#[path = "diagram_test.rs"]
mod tests;
