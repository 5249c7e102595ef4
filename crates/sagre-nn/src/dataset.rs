//! Batching for edge and node-label training data.
//!
//! A dataset is consumed once per epoch through
//! `shuffled_batches(batch_size, seed)`; call it again with a new seed
//! for the next epoch. Iteration is restartable per epoch, not
//! mid-epoch.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use sagre_core::{Graph, NodeId};
use std::collections::HashMap;

/// Iterator over shuffled fixed-size batches. The final batch may be
/// smaller.
pub struct Batches<T> {
    items: Vec<T>,
    batch_size: usize,
    pos: usize,
}

impl<T: Clone> Iterator for Batches<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        if self.pos >= self.items.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.items.len());
        let batch = self.items[self.pos..end].to_vec();
        self.pos = end;
        Some(batch)
    }
}

fn shuffled<T: Clone>(items: &[T], batch_size: usize, seed: u64) -> Batches<T> {
    let mut items = items.to_vec();
    let mut rng = XorShiftRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    Batches {
        items,
        batch_size: batch_size.max(1),
        pos: 0,
    }
}

/// Edges for the unsupervised objective, one `(src, dst)` pair per
/// training example.
#[derive(Debug, Clone)]
pub struct EdgeDataset {
    edges: Vec<(NodeId, NodeId)>,
}

impl EdgeDataset {
    /// Dataset over an explicit edge list.
    pub fn new(edges: Vec<(NodeId, NodeId)>) -> Self {
        Self { edges }
    }

    /// Dataset over every edge of a built graph.
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            edges: graph.edges().to_vec(),
        }
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether there are no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Shuffled batches for one epoch.
    pub fn shuffled_batches(&self, batch_size: usize, seed: u64) -> Batches<(NodeId, NodeId)> {
        shuffled(&self.edges, batch_size, seed)
    }
}

/// Labeled nodes for the supervised objective.
#[derive(Debug, Clone)]
pub struct NodeLabelDataset {
    examples: Vec<(NodeId, u32)>,
}

impl NodeLabelDataset {
    /// Dataset over explicit `(node, class)` examples.
    pub fn new(examples: Vec<(NodeId, u32)>) -> Self {
        Self { examples }
    }

    /// Dataset from a label map, ordered by node id so construction is
    /// deterministic.
    pub fn from_labels(labels: &HashMap<NodeId, u32>) -> Self {
        let mut examples: Vec<(NodeId, u32)> = labels.iter().map(|(&n, &c)| (n, c)).collect();
        examples.sort_unstable();
        Self { examples }
    }

    /// Number of labeled nodes.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether there are no examples.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// All examples in id order.
    pub fn examples(&self) -> &[(NodeId, u32)] {
        &self.examples
    }

    /// Shuffled batches for one epoch.
    pub fn shuffled_batches(&self, batch_size: usize, seed: u64) -> Batches<(NodeId, u32)> {
        shuffled(&self.examples, batch_size, seed)
    }
}
