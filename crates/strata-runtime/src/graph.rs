//! Directed connection graph between named nodes.
//!
//! Composites connect children and machines connect composites with
//! the same structure: a source name maps to an ordered set of target
//! names. The graph holds names only, never the nodes themselves, so
//! removing a node is a matter of dropping its edges.
//!
//! ```text
//! edges: BTreeMap<source, BTreeSet<target>>
//!
//!   reader ──► parser ──► validator
//!                 └─────► logger
//! ```
//!
//! `ConnectionGraph` does no locking of its own; owners keep it behind
//! their lock and check that names exist before connecting.

use std::collections::{BTreeMap, BTreeSet};

/// Directed graph of `(source, target)` name pairs.
///
/// # Example
///
/// ```
/// use strata_runtime::graph::ConnectionGraph;
///
/// let mut graph = ConnectionGraph::new();
/// assert!(graph.connect("reader", "parser"));
/// assert!(!graph.connect("reader", "parser"));
/// assert!(graph.connect("parser", "logger"));
///
/// assert_eq!(graph.targets("reader"), vec!["parser".to_string()]);
/// assert_eq!(graph.remove_node("parser").len(), 2);
/// assert!(graph.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ConnectionGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge. Returns `false` if it already existed.
    pub fn connect(&mut self, source: &str, target: &str) -> bool {
        self.edges
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string())
    }

    /// Removes an edge. Returns `false` if it did not exist.
    pub fn disconnect(&mut self, source: &str, target: &str) -> bool {
        let Some(targets) = self.edges.get_mut(source) else {
            return false;
        };
        let removed = targets.remove(target);
        if targets.is_empty() {
            self.edges.remove(source);
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, source: &str, target: &str) -> bool {
        self.edges.get(source).is_some_and(|t| t.contains(target))
    }

    /// Direct downstream targets of `source`, in name order.
    #[must_use]
    pub fn targets(&self, source: &str) -> Vec<String> {
        self.edges
            .get(source)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Nodes with an edge into `target`, in name order.
    #[must_use]
    pub fn sources(&self, target: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(_, t)| t.contains(target))
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// All edges, ordered by source then target.
    #[must_use]
    pub fn edges(&self) -> Vec<(String, String)> {
        self.edges
            .iter()
            .flat_map(|(s, ts)| ts.iter().map(move |t| (s.clone(), t.clone())))
            .collect()
    }

    /// Drops every edge touching `node` and returns them.
    pub fn remove_node(&mut self, node: &str) -> Vec<(String, String)> {
        let mut removed: Vec<(String, String)> = self
            .edges
            .remove(node)
            .map(|ts| ts.into_iter().map(|t| (node.to_string(), t)).collect())
            .unwrap_or_default();

        for (source, targets) in &mut self.edges {
            if targets.remove(node) {
                removed.push((source.clone(), node.to_string()));
            }
        }
        self.edges.retain(|_, t| !t.is_empty());
        removed
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
