//! Index-based adjacency for the layout engine.
//!
//! Node names are interned into a dense arena in order of first appearance
//! (explicit node list first, then edge endpoints in extraction order), so
//! every later pass can work on `usize` indices and stay deterministic.

use std::collections::HashMap;

/// Errors produced when a flowchart cannot be laid out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Every node has at least one incoming edge.
    #[error("no start node: every node has an incoming edge")]
    NoRoot,

    /// More than one node has no incoming edge.
    #[error("ambiguous start node: {} candidates ({})", candidates.len(), candidates.join(", "))]
    AmbiguousRoot { candidates: Vec<String> },

    /// Origin or step values that would stall placement.
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
}

impl crate::error::ErrorCode for LayoutError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoRoot => "E_NO_ROOT",
            Self::AmbiguousRoot { .. } => "E_AMBIGUOUS_ROOT",
            Self::InvalidConfig(_) => "E_INVALID_LAYOUT_CONFIG",
        }
    }
}

/// Directed graph over interned node names.
#[derive(Debug, Default)]
pub struct FlowGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
}

impl FlowGraph {
    /// Build the graph. Repeated `(from, to)` pairs are kept once, at their
    /// first position.
    #[must_use]
    pub fn build(nodes: &[String], edges: &[(String, String)]) -> Self {
        let mut graph = Self::default();
        for name in nodes {
            graph.intern(name);
        }
        for (from, to) in edges {
            let from = graph.intern(from);
            let to = graph.intern(to);
            if graph.children[from].contains(&to) {
                continue;
            }
            graph.children[from].push(to);
            graph.parents[to].push(from);
        }
        graph
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_owned());
        self.index.insert(name.to_owned(), idx);
        self.children.push(Vec::new());
        self.parents.push(Vec::new());
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    /// Outgoing targets in extraction order.
    #[must_use]
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Incoming sources in extraction order.
    #[must_use]
    pub fn parents(&self, idx: usize) -> &[usize] {
        &self.parents[idx]
    }

    /// Find the single node with no incoming edge.
    ///
    /// # Errors
    ///
    /// Returns `NoRoot` when every node has a parent and `AmbiguousRoot`
    /// (candidates sorted) when several nodes have none.
    pub fn root(&self) -> Result<usize, LayoutError> {
        let candidates: Vec<usize> = (0..self.len())
            .filter(|&idx| self.parents[idx].is_empty())
            .collect();
        match candidates.as_slice() {
            [] => Err(LayoutError::NoRoot),
            [root] => Ok(*root),
            many => {
                let mut names: Vec<String> = many.iter().map(|&idx| self.names[idx].clone()).collect();
                names.sort();
                Err(LayoutError::AmbiguousRoot { candidates: names })
            }
        }
    }
}
