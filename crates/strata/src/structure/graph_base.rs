//! Low-level graph data structures and primitives.
//!
//! This module provides the directed multigraph the dependency graph is built
//! on. It is a small custom structure rather than an external graph library.
//!
//! # Architecture
//!
//! The module provides:
//! - [`EdgeIndex`]: Index of an edge in insertion order
//! - [`Edge`]: Edge structure storing source, target, and associated data
//! - [`GraphInternal`]: Core graph implementation with nodes and edges
//!
//! Capabilities:
//! - Node storage in insertion order, with the node value as its own identity
//! - Tracking of both incoming and outgoing edges per node
//! - Root detection (nodes with no incoming edges)
//! - Node removal together with every incident edge
//! - Kahn topological ordering with cycle extraction
//!
//! This is an internal module; its types are wrapped by
//! [`DependencyGraph`](super::DependencyGraph).

use std::{collections::VecDeque, fmt::Debug, hash::Hash};

use indexmap::{IndexMap, IndexSet};

// =============================================================================
// Low-level primitive types and internal data structures
// =============================================================================

/// Index of an edge in the graph's edge list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct EdgeIndex(usize);

/// A directed edge in the graph.
///
/// Stores the source and target nodes along with an associated value of
/// generic type `E`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Edge<N, E>
where
    N: Copy + Debug,
    E: Copy + Debug,
{
    pub(super) source: N,
    pub(super) target: N,
    pub(super) value: E,
}

// =============================================================================
// Core internal graph structure
// =============================================================================

/// Core graph data structure.
///
/// The graph is directed and allows multiple edges between the same pair of
/// nodes. Self-loops are never inserted; callers reject them first.
///
/// Type parameters:
/// - `N`: Node type, which is also the node's identity
/// - `E`: Edge data type
#[derive(Debug, Clone)]
pub(super) struct GraphInternal<N, E>
where
    N: Copy + Debug + Eq + Hash,
    E: Copy + Debug,
{
    nodes: IndexSet<N>,
    edges: Vec<Edge<N, E>>,
    income_edges: IndexMap<N, Vec<EdgeIndex>>,
    outgoing_edges: IndexMap<N, Vec<EdgeIndex>>,
}

impl<N, E> GraphInternal<N, E>
where
    N: Copy + Debug + Eq + Hash,
    E: Copy + Debug,
{
    /// Creates a new empty graph.
    pub(super) fn new() -> Self {
        GraphInternal {
            nodes: IndexSet::new(),
            edges: Vec::new(),
            income_edges: IndexMap::new(),
            outgoing_edges: IndexMap::new(),
        }
    }

    /// Returns an iterator over all nodes in insertion order.
    pub(super) fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.nodes.iter().copied()
    }

    /// Returns the total number of nodes in the graph.
    pub(super) fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if the node exists in the graph.
    pub(super) fn contains_node(&self, node: N) -> bool {
        self.nodes.contains(&node)
    }

    /// Returns an iterator over all edges in insertion order.
    pub(super) fn edges(&self) -> impl Iterator<Item = Edge<N, E>> + '_ {
        self.edges.iter().copied()
    }

    /// Returns the total number of edges in the graph.
    pub(super) fn edges_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns an iterator over root nodes (nodes with no incoming edges).
    pub(super) fn roots(&self) -> impl Iterator<Item = N> + '_ {
        self.nodes
            .iter()
            .filter(|node| !self.income_edges.contains_key(*node))
            .copied()
    }

    /// Returns the edges leaving `source`.
    pub(super) fn outgoing(&self, source: N) -> impl Iterator<Item = Edge<N, E>> + '_ {
        self.outgoing_edges
            .get(&source)
            .into_iter()
            .flatten()
            .map(|idx| self.edges[idx.0])
    }

    /// Returns the edges entering `target`.
    pub(super) fn incoming(&self, target: N) -> impl Iterator<Item = Edge<N, E>> + '_ {
        self.income_edges
            .get(&target)
            .into_iter()
            .flatten()
            .map(|idx| self.edges[idx.0])
    }

    /// Checks if an edge from `source` to `target` carrying `value` exists.
    pub(super) fn contains_edge(&self, source: N, target: N, value: E) -> bool
    where
        E: PartialEq,
    {
        self.outgoing(source)
            .any(|edge| edge.target == target && edge.value == value)
    }

    /// Returns an iterator over nodes that are targets of outgoing edges from the given source.
    pub(super) fn outgoing_nodes(&self, source: N) -> impl Iterator<Item = N> + '_ {
        self.outgoing(source).map(|edge| edge.target)
    }

    /// Adds a node to the graph.
    ///
    /// Returns `false` if the node was already present.
    pub(super) fn add_node(&mut self, node: N) -> bool {
        self.nodes.insert(node)
    }

    /// Adds a directed edge to the graph between two nodes.
    ///
    /// # Panics
    /// Panics in debug mode if either node does not exist in the graph or the
    /// edge is a self-loop.
    pub(super) fn add_edge(&mut self, source: N, target: N, value: E) -> EdgeIndex {
        #[cfg(debug_assertions)]
        {
            assert!(
                self.nodes.contains(&source),
                "Adding edge: Source node {source:?} does not exist for {value:?}",
            );
            assert!(
                self.nodes.contains(&target),
                "Adding edge: Target node {target:?} does not exist for {value:?}",
            );
            assert!(source != target, "Adding edge: self-loop on {source:?}");
        }

        self.edges.push(Edge {
            source,
            target,
            value,
        });

        let idx = EdgeIndex(self.edges.len() - 1);
        self.outgoing_edges.entry(source).or_default().push(idx);
        self.income_edges.entry(target).or_default().push(idx);
        idx
    }

    /// Removes every node rejected by `keep` together with its incident edges.
    ///
    /// Edge indices handed out earlier are invalidated.
    pub(super) fn retain_nodes(&mut self, mut keep: impl FnMut(N) -> bool) {
        self.nodes.retain(|node| keep(*node));
        let edges = std::mem::take(&mut self.edges);
        self.income_edges.clear();
        self.outgoing_edges.clear();
        for edge in edges {
            if self.nodes.contains(&edge.source) && self.nodes.contains(&edge.target) {
                self.add_edge(edge.source, edge.target, edge.value);
            }
        }
    }

    /// Orders the nodes accepted by `include` so that every edge target comes
    /// before its source, considering only edges between included nodes.
    ///
    /// Ties are broken by insertion order. When the included sub-graph has a
    /// cycle, returns the nodes of one cycle in edge order instead.
    pub(super) fn dependency_order(&self, include: impl Fn(N) -> bool) -> Result<Vec<N>, Vec<N>> {
        let members: IndexSet<N> = self.nodes.iter().copied().filter(|n| include(*n)).collect();

        // Out-degree counts unmet dependencies: a node is ready once every
        // node it points at has been emitted.
        let mut pending: IndexMap<N, usize> = members
            .iter()
            .map(|node| {
                let count = self
                    .outgoing_nodes(*node)
                    .filter(|target| members.contains(target))
                    .count();
                (*node, count)
            })
            .collect();

        let mut ready: VecDeque<N> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(members.len());

        while let Some(node) = ready.pop_front() {
            order.push(node);
            for edge in self.incoming(node) {
                if let Some(count) = pending.get_mut(&edge.source) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(edge.source);
                    }
                }
            }
        }

        if order.len() == members.len() {
            return Ok(order);
        }

        let emitted: IndexSet<N> = order.into_iter().collect();
        let remaining: IndexSet<N> = members.difference(&emitted).copied().collect();
        Err(self.find_cycle(&remaining))
    }

    /// Walks outgoing edges inside `remaining` until a node repeats.
    ///
    /// Every node left over by Kahn's algorithm has an outgoing edge to
    /// another left-over node, so the walk always closes a cycle.
    fn find_cycle(&self, remaining: &IndexSet<N>) -> Vec<N> {
        let Some(mut current) = remaining.first().copied() else {
            return Vec::new();
        };
        let mut path: IndexSet<N> = IndexSet::new();
        while path.insert(current) {
            match self.outgoing_nodes(current).find(|next| remaining.contains(next)) {
                Some(next) => current = next,
                None => return path.into_iter().collect(),
            }
        }
        let start = path.get_index_of(&current).unwrap_or(0);
        path.into_iter().skip(start).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strata_core::identifier::Id;

    /// Test edge data structure with a weight attribute
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct TestEdge {
        weight: i32,
    }

    fn graph_with(nodes: &[&str]) -> GraphInternal<Id, TestEdge> {
        let mut graph = GraphInternal::new();
        for node in nodes {
            graph.add_node(Id::new(node));
        }
        graph
    }

    #[test]
    fn test_graph_new() {
        let graph: GraphInternal<Id, TestEdge> = GraphInternal::new();

        assert_eq!(graph.nodes_count(), 0);
        assert_eq!(graph.edges().count(), 0);
        assert_eq!(graph.roots().count(), 0);
    }

    #[test]
    fn test_add_node_reports_duplicates() {
        let mut graph: GraphInternal<Id, TestEdge> = GraphInternal::new();

        assert!(graph.add_node(Id::new("a")));
        assert!(!graph.add_node(Id::new("a")));
        assert_eq!(graph.nodes_count(), 1);
        assert!(graph.contains_node(Id::new("a")));
    }

    #[test]
    fn test_add_edge() {
        let mut graph = graph_with(&["source", "target"]);
        let edge = TestEdge { weight: 5 };

        let idx = graph.add_edge(Id::new("source"), Id::new("target"), edge);

        assert_eq!(idx, EdgeIndex(0));
        let stored = graph.edges().next().unwrap();
        assert_eq!(stored.value, edge);
        assert_eq!(stored.target, Id::new("target"));
        assert_eq!(graph.edges_count(), 1);
    }

    #[test]
    fn test_contains_edge_matches_value() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 1 });

        assert!(graph.contains_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 1 }));
        assert!(!graph.contains_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 2 }));
        assert!(!graph.contains_edge(Id::new("b"), Id::new("a"), TestEdge { weight: 1 }));
    }

    #[test]
    fn test_roots() {
        let mut graph = graph_with(&["root1", "root2", "child"]);
        graph.add_edge(Id::new("root1"), Id::new("child"), TestEdge { weight: 1 });

        let roots: Vec<Id> = graph.roots().collect();
        assert_eq!(roots, vec![Id::new("root1"), Id::new("root2")]);
    }

    #[test]
    fn test_incoming_and_outgoing() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 1 });
        graph.add_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 2 });
        graph.add_edge(Id::new("c"), Id::new("b"), TestEdge { weight: 3 });

        assert_eq!(graph.outgoing(Id::new("a")).count(), 2);
        assert_eq!(graph.incoming(Id::new("b")).count(), 3);
        assert_eq!(graph.outgoing_nodes(Id::new("b")).count(), 0);
    }

    #[test]
    fn test_retain_nodes_drops_incident_edges() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 1 });
        graph.add_edge(Id::new("b"), Id::new("c"), TestEdge { weight: 2 });
        graph.add_edge(Id::new("a"), Id::new("c"), TestEdge { weight: 3 });

        graph.retain_nodes(|node| node != Id::new("b"));

        assert_eq!(graph.nodes_count(), 2);
        let edges: Vec<i32> = graph.edges().map(|edge| edge.value.weight).collect();
        assert_eq!(edges, vec![3]);
        assert_eq!(graph.incoming(Id::new("c")).count(), 1);
    }

    #[test]
    fn test_dependency_order_puts_targets_first() {
        // Diamond: top depends on left and right, both depend on bottom.
        let mut graph = graph_with(&["top", "left", "right", "bottom"]);
        graph.add_edge(Id::new("top"), Id::new("left"), TestEdge { weight: 1 });
        graph.add_edge(Id::new("top"), Id::new("right"), TestEdge { weight: 2 });
        graph.add_edge(Id::new("left"), Id::new("bottom"), TestEdge { weight: 3 });
        graph.add_edge(Id::new("right"), Id::new("bottom"), TestEdge { weight: 4 });

        let order = graph.dependency_order(|_| true).unwrap();
        assert_eq!(
            order,
            vec![
                Id::new("bottom"),
                Id::new("left"),
                Id::new("right"),
                Id::new("top")
            ]
        );
    }

    #[test]
    fn test_dependency_order_respects_filter() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Id::new("a"), Id::new("b"), TestEdge { weight: 1 });
        graph.add_edge(Id::new("b"), Id::new("a"), TestEdge { weight: 2 });
        graph.add_edge(Id::new("c"), Id::new("a"), TestEdge { weight: 3 });

        let order = graph
            .dependency_order(|node| node != Id::new("b"))
            .unwrap();
        assert_eq!(order, vec![Id::new("a"), Id::new("c")]);
    }

    #[test]
    fn test_dependency_order_reports_cycle() {
        let mut graph = graph_with(&["entry", "x", "y", "z"]);
        graph.add_edge(Id::new("entry"), Id::new("x"), TestEdge { weight: 1 });
        graph.add_edge(Id::new("x"), Id::new("y"), TestEdge { weight: 2 });
        graph.add_edge(Id::new("y"), Id::new("z"), TestEdge { weight: 3 });
        graph.add_edge(Id::new("z"), Id::new("x"), TestEdge { weight: 4 });

        let cycle = graph.dependency_order(|_| true).unwrap_err();
        assert_eq!(cycle, vec![Id::new("x"), Id::new("y"), Id::new("z")]);
    }
}
