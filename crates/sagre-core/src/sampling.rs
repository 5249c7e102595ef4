//! Neighbor sampling for mini-batch GraphSAGE training.
//!
//! The key idea: instead of convolving over the full adjacency matrix,
//! each aggregation layer queries a bounded, freshly-sampled
//! neighborhood for its current node set. Per-layer fan-out caps keep
//! the cost of one root node at `O(prod fanout_i)` regardless of graph
//! size, and the per-call re-sampling acts as a regularizer during
//! training (similar in spirit to dropout).
//!
//! # Key Types
//!
//! - [`SubGraph`] - first-order neighbor queries over a built [`Graph`]
//! - [`NeighborSample`] - concatenated neighbor ids plus the grouping
//!   that ties each block back to its query node
//! - [`SamplingPolicy`] - pluggable per-node sampling rule
//! - [`negative_sampling`] - uniform non-neighbor draws for contrastive
//!   objectives

use crate::{Graph, NodeId, Result};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use std::collections::HashSet;
use std::sync::Mutex;

/// How to reduce a node's true neighbor list to a sampled block.
///
/// Implementations must be pure in the sense that the output depends
/// only on the input list, the fan-out and the rng state; never on
/// call order of other nodes.
pub trait SamplingPolicy: Send + Sync {
    /// Sample up to `fanout` ids from `neighbors`.
    fn sample(&self, neighbors: &[NodeId], fanout: usize, rng: &mut XorShiftRng) -> Vec<NodeId>;
}

/// Uniform sampling without replacement.
///
/// When a node has fewer than `fanout` neighbors the full true set is
/// returned; blocks may be smaller than the cap, never padded. This is
/// the documented resolution of the "fewer neighbors than the cap"
/// question; callers that need fixed-size blocks use
/// [`ReplacementSampler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSampler;

impl SamplingPolicy for UniformSampler {
    fn sample(&self, neighbors: &[NodeId], fanout: usize, rng: &mut XorShiftRng) -> Vec<NodeId> {
        if neighbors.len() <= fanout {
            neighbors.to_vec()
        } else {
            neighbors.choose_multiple(rng, fanout).copied().collect()
        }
    }
}

/// Uniform sampling with replacement: exactly `fanout` draws, allowing
/// duplicates. Nodes with no neighbors still yield an empty block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplacementSampler;

impl SamplingPolicy for ReplacementSampler {
    fn sample(&self, neighbors: &[NodeId], fanout: usize, rng: &mut XorShiftRng) -> Vec<NodeId> {
        if neighbors.is_empty() {
            return Vec::new();
        }
        (0..fanout)
            .map(|_| neighbors[rng.random_range(0..neighbors.len())])
            .collect()
    }
}

/// The result of a first-order neighbor query for a batch of nodes.
///
/// `neighbors` holds every sampled neighbor id, concatenated in query
/// order; `counts[i]` says how many of them belong to query node `i`.
/// Invariant: `counts.len() == number of query nodes` and
/// `counts.iter().sum() == neighbors.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborSample {
    neighbors: Vec<NodeId>,
    counts: Vec<usize>,
}

impl NeighborSample {
    /// Assemble a sample from parts.
    ///
    /// # Panics
    ///
    /// Panics if the counts do not account for every neighbor; the
    /// grouping invariant is what aggregation correctness rests on.
    pub fn new(neighbors: Vec<NodeId>, counts: Vec<usize>) -> Self {
        assert_eq!(
            counts.iter().sum::<usize>(),
            neighbors.len(),
            "counts must sum to the number of neighbors"
        );
        Self { neighbors, counts }
    }

    /// Concatenated neighbor ids, grouped by query node.
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    /// Block size per query node.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Number of query nodes.
    pub fn num_queries(&self) -> usize {
        self.counts.len()
    }

    /// Total number of sampled neighbors.
    pub fn total(&self) -> usize {
        self.neighbors.len()
    }

    /// Start offset of each query node's block.
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.counts.len());
        let mut acc = 0;
        for &c in &self.counts {
            offsets.push(acc);
            acc += c;
        }
        offsets
    }

    /// Iterate over per-query neighbor blocks.
    pub fn blocks(&self) -> impl Iterator<Item = &[NodeId]> + '_ {
        let mut offset = 0;
        self.counts.iter().map(move |&c| {
            let block = &self.neighbors[offset..offset + c];
            offset += c;
            block
        })
    }
}

/// A sampling view over a built [`Graph`].
///
/// Answers "first-order neighbors" for an ordered node sequence. The
/// random source is owned and seedable so tests can fix it; there is no
/// process-global state. Each call re-samples; results are not cached,
/// by design.
///
/// # Example
///
/// ```rust
/// use sagre_core::{GraphBuilder, NodeId, SubGraph};
///
/// let mut builder = GraphBuilder::new();
/// builder.add_edge(NodeId::new(0), NodeId::new(1));
/// builder.add_edge(NodeId::new(0), NodeId::new(2));
/// builder.add_edge(NodeId::new(0), NodeId::new(3));
/// let graph = builder.build();
///
/// let sub_graph = SubGraph::new(&graph, 42);
/// let sample = sub_graph.first_order(&[NodeId::new(0)], 2).unwrap();
/// assert_eq!(sample.counts(), &[2]);
/// assert_eq!(sample.total(), 2);
/// ```
pub struct SubGraph<'a> {
    graph: &'a Graph,
    policy: Box<dyn SamplingPolicy>,
    rng: Mutex<XorShiftRng>,
}

impl<'a> SubGraph<'a> {
    /// Create a view with the default [`UniformSampler`] policy.
    pub fn new(graph: &'a Graph, seed: u64) -> Self {
        Self::with_policy(graph, Box::new(UniformSampler), seed)
    }

    /// Create a view with an explicit sampling policy.
    pub fn with_policy(graph: &'a Graph, policy: Box<dyn SamplingPolicy>, seed: u64) -> Self {
        Self {
            graph,
            policy,
            rng: Mutex::new(XorShiftRng::seed_from_u64(seed)),
        }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Sample up to `fanout` first-order neighbors for each query node.
    ///
    /// Neighbor blocks come back concatenated in query order with the
    /// per-node counts as the grouping side-channel. Isolated nodes get
    /// an empty block; ids not in the graph are a fatal error.
    pub fn first_order(&self, nodes: &[NodeId], fanout: usize) -> Result<NeighborSample> {
        let mut rng = self.rng.lock().expect("sampler rng poisoned");

        let mut neighbors = Vec::new();
        let mut counts = Vec::with_capacity(nodes.len());

        for &node in nodes {
            let full = self.graph.neighbors(node)?;
            let sampled = self.policy.sample(&full, fanout, &mut rng);
            counts.push(sampled.len());
            neighbors.extend(sampled);
        }

        Ok(NeighborSample { neighbors, counts })
    }
}

/// Cap on rejection-sampling retries per negative draw.
const MAX_RESAMPLE: usize = 100;

/// Draw `num_negatives` uniform non-neighbor ids for each source node.
///
/// For a source `s`, a draw is rejected while it equals `s` or is a
/// first-order neighbor of `s`. On pathological graphs where almost
/// every node neighbors `s`, rejection gives up after a bounded number
/// of retries and keeps the last draw rather than looping forever.
///
/// The result is flat: `num_negatives` consecutive ids per source, in
/// source order.
pub fn negative_sampling(
    graph: &Graph,
    srcs: &[NodeId],
    num_negatives: usize,
    rng: &mut XorShiftRng,
) -> Result<Vec<NodeId>> {
    let nodes = graph.node_set();
    if nodes.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(srcs.len() * num_negatives);
    for &src in srcs {
        let mut forbidden: HashSet<NodeId> = graph.neighbors(src)?.into_iter().collect();
        forbidden.insert(src);

        for _ in 0..num_negatives {
            let mut pick = nodes[rng.random_range(0..nodes.len())];
            for _ in 0..MAX_RESAMPLE {
                if !forbidden.contains(&pick) {
                    break;
                }
                pick = nodes[rng.random_range(0..nodes.len())];
            }
            out.push(pick);
        }
    }

    Ok(out)
}
