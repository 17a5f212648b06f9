//! C6: the filter graph and ports (spec §4.6), grounded on
//! `port.cpp`/`filter_base.cpp` and redesigned per spec §9:
//! "Linear graph as array + indices" — filters live in a `Vec`, ports are
//! `(FilterIndex, PortId)` pairs resolved through table lookup, never a
//! cyclic ref-counted graph.

use crate::error::{EffectError, Result};

/// Index of a filter within the linear graph.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FilterIndex(pub usize);

/// A filter's default in-port or out-port (spec §4.6: "one default in-port
/// and one default out-port").
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PortId {
    In(FilterIndex),
    Out(FilterIndex),
}

/// Per-filter lifecycle state (spec §4.6).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterState {
    Created,
    Initialized,
    Preparing,
    Running,
    Ready,
}

/// Node metadata tracked per filter slot in the graph.
pub struct FilterNode {
    pub name: String,
    pub state: FilterState,
}

/// The linear source → filter₁ → … → filterₙ → sink graph.
///
/// Connections are implicit in adjacency (index `i` feeds index `i+1`):
/// there is no separate edge table to keep consistent, which is the whole
/// point of modeling this as a vector instead of a graph of ref-counted
/// port objects.
#[derive(Default)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    pub fn new() -> Self {
        FilterGraph { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>) -> FilterIndex {
        let idx = FilterIndex(self.nodes.len());
        self.nodes.push(FilterNode {
            name: name.into(),
            state: FilterState::Created,
        });
        idx
    }

    pub fn insert(&mut self, at: usize, name: impl Into<String>) -> Result<FilterIndex> {
        if at > self.nodes.len() {
            return Err(EffectError::InvalidFilter(format!("insert index {} out of range", at)));
        }
        self.nodes.insert(
            at,
            FilterNode {
                name: name.into(),
                state: FilterState::Created,
            },
        );
        Ok(FilterIndex(at))
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<()> {
        let pos = self
            .nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| EffectError::InvalidFilter(name.to_string()))?;
        self.nodes.remove(pos);
        Ok(())
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn replace(&mut self, name: &str, new_name: impl Into<String>) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| EffectError::InvalidFilter(name.to_string()))?;
        node.name = new_name.into();
        node.state = FilterState::Created;
        Ok(())
    }

    pub fn node(&self, idx: FilterIndex) -> Result<&FilterNode> {
        self.nodes
            .get(idx.0)
            .ok_or(EffectError::InvalidPort(PortId::In(idx)))
    }

    pub fn node_mut(&mut self, idx: FilterIndex) -> Result<&mut FilterNode> {
        self.nodes
            .get_mut(idx.0)
            .ok_or(EffectError::InvalidPort(PortId::In(idx)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// `in_port`/`out_port` resolve to the neighboring filter index, or
    /// `None` at the graph's boundary (where the source/sink attach).
    pub fn out_port(&self, idx: FilterIndex) -> Option<FilterIndex> {
        if idx.0 + 1 < self.nodes.len() {
            Some(FilterIndex(idx.0 + 1))
        } else {
            None
        }
    }

    pub fn in_port(&self, idx: FilterIndex) -> Option<FilterIndex> {
        if idx.0 == 0 {
            None
        } else {
            Some(FilterIndex(idx.0 - 1))
        }
    }

    /// Transitions every node forward one lifecycle step, front-to-back,
    /// as `Prepare`/`Start` do during the Run phase (spec §4.6).
    pub fn advance_all(&mut self, to: FilterState) {
        for node in &mut self.nodes {
            node.state = to;
        }
    }
}

/// Priority filters (spec §4.11) must appear first in insertion order.
/// Inserting a new priority filter places it just before the last existing
/// priority filter, or at position 0 if none exist yet.
pub fn priority_insert_position(graph: &FilterGraph, priority_names: &[&str]) -> usize {
    let mut last_priority_pos = None;
    for (i, name) in graph.names().iter().enumerate() {
        if priority_names.contains(name) {
            last_priority_pos = Some(i);
        }
    }
    match last_priority_pos {
        Some(pos) => pos,
        None => 0,
    }
}
