//! Input feature store for nodes.

use crate::{Error, NodeId, Result};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::collections::HashMap;

/// Maps node id to its initial input feature vector.
///
/// Mutable only at load/init time (`random_init`, `insert`); during
/// training every forward call reads it through a shared reference.
/// Dense per node but sparse over the id space; ids need not be
/// contiguous, which is why this is a map and not a matrix.
///
/// # Example
///
/// ```rust
/// use sagre_core::{NodeEmbedding, NodeId};
/// use rand_xorshift::XorShiftRng;
/// use rand::SeedableRng;
///
/// let mut store = NodeEmbedding::new(16);
/// let nodes: Vec<NodeId> = (0..10).map(NodeId::new).collect();
/// let mut rng = XorShiftRng::seed_from_u64(42);
/// store.random_init(&nodes, &mut rng);
///
/// assert_eq!(store.len(), 10);
/// assert_eq!(store.get(NodeId::new(3)).unwrap().len(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct NodeEmbedding {
    dim: usize,
    features: HashMap<NodeId, Vec<f32>>,
}

impl NodeEmbedding {
    /// Create an empty store for `dim`-dimensional features.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            features: HashMap::new(),
        }
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of nodes with features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Whether a node has a feature vector.
    pub fn contains(&self, node: NodeId) -> bool {
        self.features.contains_key(&node)
    }

    /// Fill every node's vector with a fixed-distribution random draw.
    ///
    /// Uses the word2vec-style uniform range `(-0.5/dim, 0.5/dim)`.
    /// Nodes already present are overwritten; this is an init-time
    /// operation, not a training-time one.
    pub fn random_init<R: Rng>(&mut self, nodes: &[NodeId], rng: &mut R) {
        let half = 0.5 / self.dim as f32;
        let dist = Uniform::new(-half, half).expect("uniform bounds are finite");

        for &node in nodes {
            let row: Vec<f32> = (0..self.dim).map(|_| dist.sample(rng)).collect();
            self.features.insert(node, row);
        }
    }

    /// Insert a feature vector for one node.
    ///
    /// Fails if the vector length does not match the store dimension.
    pub fn insert(&mut self, node: NodeId, row: Vec<f32>) -> Result<()> {
        if row.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: row.len(),
            });
        }
        self.features.insert(node, row);
        Ok(())
    }

    /// Feature vector for one node.
    pub fn get(&self, node: NodeId) -> Option<&[f32]> {
        self.features.get(&node).map(Vec::as_slice)
    }

    /// Gather feature rows for a node sequence, row-major, in input
    /// order.
    ///
    /// The result has `nodes.len() * dim` entries. A node without a
    /// feature vector is a fatal error, never a zero row.
    pub fn gather(&self, nodes: &[NodeId]) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(nodes.len() * self.dim);
        for &node in nodes {
            let row = self.features.get(&node).ok_or(Error::UnknownNode(node))?;
            out.extend_from_slice(row);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn n(id: u64) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn test_random_init_fills_all_nodes() {
        let mut store = NodeEmbedding::new(8);
        let nodes: Vec<NodeId> = (0..5).map(NodeId::new).collect();
        let mut rng = XorShiftRng::seed_from_u64(7);
        store.random_init(&nodes, &mut rng);

        assert_eq!(store.len(), 5);
        for node in nodes {
            assert_eq!(store.get(node).unwrap().len(), 8);
        }
    }

    #[test]
    fn test_random_init_is_seeded() {
        let nodes: Vec<NodeId> = (0..3).map(NodeId::new).collect();

        let mut a = NodeEmbedding::new(4);
        let mut b = NodeEmbedding::new(4);
        a.random_init(&nodes, &mut XorShiftRng::seed_from_u64(42));
        b.random_init(&nodes, &mut XorShiftRng::seed_from_u64(42));

        assert_eq!(a.get(n(1)), b.get(n(1)));
    }

    #[test]
    fn test_gather_preserves_order() {
        let mut store = NodeEmbedding::new(2);
        store.insert(n(0), vec![0.0, 0.0]).unwrap();
        store.insert(n(1), vec![1.0, 1.0]).unwrap();
        store.insert(n(2), vec![2.0, 2.0]).unwrap();

        let flat = store.gather(&[n(2), n(0), n(1)]).unwrap();
        assert_eq!(flat, vec![2.0, 2.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_gather_unknown_node_fails() {
        let store = NodeEmbedding::new(2);
        assert!(store.gather(&[n(9)]).is_err());
    }

    #[test]
    fn test_insert_dimension_checked() {
        let mut store = NodeEmbedding::new(3);
        assert!(store.insert(n(0), vec![1.0, 2.0]).is_err());
        assert!(store.insert(n(0), vec![1.0, 2.0, 3.0]).is_ok());
    }
}
