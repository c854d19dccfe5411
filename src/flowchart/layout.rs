//! Layout engine: assigns every node reachable from the root a position.
//!
//! DESIGN
//! ======
//! A cheap depth-first spread produces a symmetric fan-out under each
//! parent. Corrective passes then fix what pure tree centering gets wrong
//! once branches reconverge:
//!
//! 1. spread (with exact-coordinate overlap avoidance)
//! 2. merge correction (merge nodes centered, parents re-spaced)
//! 3. parent re-centering over tree children, bottom-up
//! 4. merge settle (merge nodes follow their parents' final lanes)
//! 5. collision sweep
//!
//! All passes run over indices into a [`FlowGraph`], in placement order,
//! so the output depends only on the input ordering.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::graph::{FlowGraph, LayoutError};

pub const DEFAULT_ORIGIN: Position = Position { x: 200.0, y: 100.0 };
pub const DEFAULT_X_STEP: f64 = 300.0;
pub const DEFAULT_Y_STEP: f64 = 100.0;

/// A point on the canvas (top-left of the node box).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Exact-coordinate key. `+ 0.0` folds `-0.0` into `0.0`.
    fn key(self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

/// Node name -> computed position.
pub type PositionMap = HashMap<String, Position>;

/// Where a merge node lands relative to its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePlacement {
    /// Centered under the parents.
    #[default]
    Midpoint,
    /// Right of the parents' span, clear of every parent lane.
    BesideParents,
}

impl MergePlacement {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "midpoint" => Some(Self::Midpoint),
            "beside_parents" => Some(Self::BesideParents),
            _ => None,
        }
    }
}

/// Spacing and placement knobs. `x_step` and `y_step` must be positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub origin: Position,
    pub x_step: f64,
    pub y_step: f64,
    pub merge_placement: MergePlacement,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN,
            x_step: DEFAULT_X_STEP,
            y_step: DEFAULT_Y_STEP,
            merge_placement: MergePlacement::Midpoint,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), LayoutError> {
        if !(self.origin.x.is_finite() && self.origin.y.is_finite()) {
            return Err(LayoutError::InvalidConfig(format!("origin ({}, {}) is not finite", self.origin.x, self.origin.y)));
        }
        for (name, step) in [("x_step", self.x_step), ("y_step", self.y_step)] {
            if !(step.is_finite() && step > 0.0) {
                return Err(LayoutError::InvalidConfig(format!("{name} must be positive and finite, got {step}")));
            }
        }
        Ok(())
    }
}

/// Compute positions for every node reachable from the unique root.
///
/// Edge endpoints missing from `nodes` are added in order of first
/// appearance. Nodes not reachable from the root get no entry.
///
/// # Errors
///
/// Returns [`LayoutError::NoRoot`] or [`LayoutError::AmbiguousRoot`] when
/// there isn't exactly one node without incoming edges, and
/// [`LayoutError::InvalidConfig`] for a non-finite origin or a step that
/// isn't a positive finite number.
pub fn compute_positions(
    nodes: &[String],
    edges: &[(String, String)],
    config: &LayoutConfig,
) -> Result<PositionMap, LayoutError> {
    config.validate()?;

    let graph = FlowGraph::build(nodes, edges);
    let root = graph.root()?;

    let mut placement = Placement::new(graph.len());
    placement.spread(&graph, root, config);

    let merges = placement.merge_flags(&graph);
    placement.correct_merges(&graph, &merges, config);
    placement.recenter_parents(&graph, &merges);
    placement.settle_merges(&graph, &merges, config);
    placement.sweep_collisions(config.x_step);

    Ok(placement.into_map(&graph))
}

// =============================================================================
// PLACEMENT
// =============================================================================

struct Placement {
    positions: Vec<Position>,
    placed: Vec<bool>,
    /// Nodes in the order the spread placed them (depth-first pre-order).
    order: Vec<usize>,
}

#[derive(Clone, Copy)]
struct Frame {
    node: usize,
    at: Position,
    next: usize,
}

impl Placement {
    fn new(len: usize) -> Self {
        Self { positions: vec![Position::default(); len], placed: vec![false; len], order: Vec::with_capacity(len) }
    }

    fn place(&mut self, node: usize, at: Position, occupied: &mut HashSet<(u64, u64)>) {
        self.positions[node] = at;
        self.placed[node] = true;
        self.order.push(node);
        occupied.insert(at.key());
    }

    /// Depth-first fan-out from the root. The explicit stack reproduces
    /// recursive pre-order: a child's whole subtree is placed before its
    /// next sibling.
    fn spread(&mut self, graph: &FlowGraph, root: usize, config: &LayoutConfig) {
        let mut occupied = HashSet::new();
        self.place(root, config.origin, &mut occupied);

        let mut stack = vec![Frame { node: root, at: config.origin, next: 0 }];
        while let Some(top) = stack.len().checked_sub(1) {
            let frame = stack[top];
            let children = graph.children(frame.node);
            let Some(&child) = children.get(frame.next) else {
                stack.pop();
                continue;
            };
            stack[top].next += 1;
            if self.placed[child] {
                continue;
            }

            let mut at = Position::new(
                frame.at.x + slot_offset(frame.next, children.len()) * config.x_step,
                frame.at.y + config.y_step,
            );
            while occupied.contains(&at.key()) {
                at.x += config.x_step;
            }
            self.place(child, at, &mut occupied);
            stack.push(Frame { node: child, at, next: 0 });
        }
    }

    /// Distinct positioned parents, self-loops excluded.
    fn positioned_parents(&self, graph: &FlowGraph, node: usize) -> Vec<usize> {
        graph
            .parents(node)
            .iter()
            .copied()
            .filter(|&p| p != node && self.placed[p])
            .collect()
    }

    fn merge_flags(&self, graph: &FlowGraph) -> Vec<bool> {
        (0..graph.len())
            .map(|node| self.placed[node] && self.positioned_parents(graph, node).len() >= 2)
            .collect()
    }

    /// Positioned children whose only positioned parent is `node`.
    fn tree_children(&self, graph: &FlowGraph, merges: &[bool], node: usize) -> Vec<usize> {
        graph
            .children(node)
            .iter()
            .copied()
            .filter(|&c| c != node && self.placed[c] && !merges[c])
            .collect()
    }

    fn x_range(&self, nodes: &[usize]) -> (f64, f64) {
        nodes
            .iter()
            .map(|&n| self.positions[n].x)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)))
    }

    fn correct_merges(&mut self, graph: &FlowGraph, merges: &[bool], config: &LayoutConfig) {
        for i in (0..self.order.len()).rev() {
            let node = self.order[i];
            if !merges[node] {
                continue;
            }

            let mut parents = self.positioned_parents(graph, node);
            let (min, max) = self.x_range(&parents);
            let mid = f64::midpoint(min, max);

            parents.sort_by(|&a, &b| self.positions[a].x.total_cmp(&self.positions[b].x));
            for (slot, &parent) in parents.iter().enumerate() {
                self.positions[parent].x = mid + slot_offset(slot, parents.len()) * config.x_step;
            }

            self.positions[node].x = match config.merge_placement {
                MergePlacement::Midpoint => mid,
                MergePlacement::BesideParents => {
                    let min_parent_x = mid + slot_offset(0, parents.len()) * config.x_step;
                    min_parent_x + span(parents.len(), config.x_step) + config.x_step
                }
            };
        }
    }

    fn recenter_parents(&mut self, graph: &FlowGraph, merges: &[bool]) {
        for i in (0..self.order.len()).rev() {
            let node = self.order[i];
            let children = self.tree_children(graph, merges, node);
            if children.is_empty() {
                continue;
            }
            let (min, max) = self.x_range(&children);
            self.positions[node].x = f64::midpoint(min, max);
        }
    }

    /// Re-anchor merge nodes against their parents' final lanes, carrying
    /// their tree subtree along so it stays centered underneath.
    fn settle_merges(&mut self, graph: &FlowGraph, merges: &[bool], config: &LayoutConfig) {
        for i in 0..self.order.len() {
            let node = self.order[i];
            if !merges[node] {
                continue;
            }
            let parents = self.positioned_parents(graph, node);
            let (min, max) = self.x_range(&parents);
            let target = match config.merge_placement {
                MergePlacement::Midpoint => f64::midpoint(min, max),
                MergePlacement::BesideParents => {
                    (min + span(parents.len(), config.x_step)).max(max) + config.x_step
                }
            };
            let dx = target - self.positions[node].x;
            self.shift_subtree(graph, merges, node, dx);
        }
    }

    fn shift_subtree(&mut self, graph: &FlowGraph, merges: &[bool], root: usize, dx: f64) {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            self.positions[node].x += dx;
            stack.extend(self.tree_children(graph, merges, node));
        }
    }

    fn sweep_collisions(&mut self, x_step: f64) {
        let mut occupied = HashSet::new();
        for &node in &self.order {
            let mut at = self.positions[node];
            while !occupied.insert(at.key()) {
                at.x += x_step;
            }
            self.positions[node] = at;
        }
    }

    fn into_map(self, graph: &FlowGraph) -> PositionMap {
        self.order
            .iter()
            .map(|&node| (graph.name(node).to_owned(), self.positions[node]))
            .collect()
    }
}

/// Offset of slot `i` among `k` slots centered on zero, in steps.
#[allow(clippy::cast_precision_loss)]
fn slot_offset(i: usize, k: usize) -> f64 {
    i as f64 - (k as f64 - 1.0) / 2.0
}

/// Width covered by `n` lanes spaced `step` apart.
#[allow(clippy::cast_precision_loss)]
fn span(n: usize, step: f64) -> f64 {
    n.saturating_sub(1) as f64 * step
}
