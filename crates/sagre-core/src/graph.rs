use crate::{NodeId, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Builder for [`Graph`].
///
/// Topology is mutable only here. Once [`GraphBuilder::build`] runs, the
/// resulting [`Graph`] never changes during training; neighbor queries
/// in the sampling hot path rely on that.
///
/// # Example
///
/// ```rust
/// use sagre_core::{GraphBuilder, NodeId};
///
/// let mut builder = GraphBuilder::new();
/// builder.add_edge(NodeId::new(0), NodeId::new(1));
/// builder.add_edge(NodeId::new(1), NodeId::new(2));
///
/// let graph = builder.build();
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    edges: Vec<(NodeId, NodeId)>,
}

impl GraphBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Create a builder with estimated edge capacity.
    pub fn with_capacity(edges: usize) -> Self {
        Self {
            edges: Vec::with_capacity(edges),
        }
    }

    /// Add a directed edge. Endpoint nodes are created implicitly.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) {
        self.edges.push((src, dst));
    }

    /// Add both directions of an edge.
    pub fn add_undirected_edge(&mut self, a: NodeId, b: NodeId) {
        self.edges.push((a, b));
        self.edges.push((b, a));
    }

    /// Number of edges added so far.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Freeze the topology into an immutable [`Graph`].
    ///
    /// Duplicate edges collapse into one so that neighbor sets are
    /// proper sets.
    pub fn build(mut self) -> Graph {
        self.edges.sort_unstable();
        self.edges.dedup();

        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();

        let mut index_of = |graph: &mut DiGraph<NodeId, ()>, id: NodeId| -> NodeIndex {
            *node_index.entry(id).or_insert_with(|| graph.add_node(id))
        };

        for &(src, dst) in &self.edges {
            let s = index_of(&mut graph, src);
            let d = index_of(&mut graph, dst);
            graph.add_edge(s, d, ());
        }

        Graph {
            graph,
            node_index,
            edges: self.edges,
        }
    }
}

/// An immutable directed graph over [`NodeId`]s.
///
/// Uses petgraph's directed graph internally plus an id index for O(1)
/// node lookup. Built once via [`GraphBuilder`]; topology does not
/// change afterwards. Input features for the nodes live in a separate
/// [`NodeEmbedding`](crate::NodeEmbedding) store.
#[derive(Debug, Clone)]
pub struct Graph {
    /// The underlying directed graph.
    graph: DiGraph<NodeId, ()>,

    /// Map from node id to petgraph index.
    node_index: HashMap<NodeId, NodeIndex>,

    /// All edges in insertion order (deduplicated), for edge datasets.
    edges: Vec<(NodeId, NodeId)>,
}

impl Graph {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph contains a node.
    pub fn contains(&self, node: NodeId) -> bool {
        self.node_index.contains_key(&node)
    }

    /// Iterate over all node ids.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().copied()
    }

    /// All node ids as a vector, e.g. for feature initialization.
    pub fn node_set(&self) -> Vec<NodeId> {
        self.nodes().collect()
    }

    /// All edges as `(src, dst)` pairs.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// First-order (out-)neighbors of a node. O(d).
    ///
    /// Returns `Err(UnknownNode)` for ids not in the graph; callers
    /// passing out-of-range ids is a contract violation, not an empty
    /// neighborhood. A node with no outgoing edges yields an empty
    /// vector.
    pub fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let idx = self
            .node_index
            .get(&node)
            .copied()
            .ok_or(crate::Error::UnknownNode(node))?;
        Ok(self.graph.neighbors(idx).map(|n| self.graph[n]).collect())
    }

    /// Out-degree of a node. O(d).
    pub fn degree(&self, node: NodeId) -> Result<usize> {
        let idx = self
            .node_index
            .get(&node)
            .copied()
            .ok_or(crate::Error::UnknownNode(node))?;
        Ok(self.graph.neighbors(idx).count())
    }

    /// Whether a directed edge exists. O(d).
    pub fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        let (Some(&s), Some(&d)) = (self.node_index.get(&src), self.node_index.get(&dst)) else {
            return false;
        };
        self.graph.find_edge(s, d).is_some()
    }

    /// Get the underlying petgraph for advanced operations.
    pub fn as_petgraph(&self) -> &DiGraph<NodeId, ()> {
        &self.graph
    }

    /// Compute statistics about the graph.
    pub fn stats(&self) -> GraphStats {
        let node_count = self.node_count();
        let edge_count = self.edge_count();

        let avg_degree = if node_count > 0 {
            edge_count as f64 / node_count as f64
        } else {
            0.0
        };

        GraphStats {
            node_count,
            edge_count,
            avg_degree,
        }
    }
}

/// Statistics about a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of edges.
    pub edge_count: usize,
    /// Average out-degree.
    pub avg_degree: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u64) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn test_build_and_query() {
        let mut builder = GraphBuilder::new();
        builder.add_edge(n(0), n(1));
        builder.add_edge(n(0), n(2));
        builder.add_edge(n(1), n(2));

        let graph = builder.build();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);

        let mut neighbors = graph.neighbors(n(0)).unwrap();
        neighbors.sort();
        assert_eq!(neighbors, vec![n(1), n(2)]);
        assert_eq!(graph.degree(n(0)).unwrap(), 2);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut builder = GraphBuilder::new();
        builder.add_edge(n(0), n(1));
        builder.add_edge(n(0), n(1));
        builder.add_edge(n(0), n(1));

        let graph = builder.build();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors(n(0)).unwrap(), vec![n(1)]);
    }

    #[test]
    fn test_undirected_edge() {
        let mut builder = GraphBuilder::new();
        builder.add_undirected_edge(n(0), n(1));

        let graph = builder.build();
        assert!(graph.has_edge(n(0), n(1)));
        assert!(graph.has_edge(n(1), n(0)));
    }

    #[test]
    fn test_sink_node_has_empty_neighborhood() {
        let mut builder = GraphBuilder::new();
        builder.add_edge(n(0), n(1));

        let graph = builder.build();
        // Node 1 exists but has no outgoing edges.
        assert!(graph.neighbors(n(1)).unwrap().is_empty());
        assert_eq!(graph.degree(n(1)).unwrap(), 0);
    }

    #[test]
    fn test_unknown_node_is_an_error() {
        let graph = GraphBuilder::new().build();
        assert!(graph.neighbors(n(42)).is_err());
        assert!(graph.degree(n(42)).is_err());
    }

    #[test]
    fn test_stats() {
        let mut builder = GraphBuilder::new();
        builder.add_edge(n(0), n(1));
        builder.add_edge(n(0), n(2));
        builder.add_edge(n(1), n(2));

        let stats = builder.build().stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 3);
        assert!((stats.avg_degree - 1.0).abs() < 1e-9);
    }
}
