//! The GraphSAGE aggregation layer.
//!
//! One layer owns a pair of learnable transforms (self and neighbor)
//! and combines a node's own previous-level embedding with a pooled
//! summary of its sampled neighbors:
//!
//! ```text
//! h_i' = relu(W_self * h_i + W_neigh * POOL({h_j : j in Sample(N(i))}))
//! ```
//!
//! Pooling must be permutation-invariant over the neighbor block since
//! sampling order carries no meaning.
//!
//! # Reference
//!
//! Hamilton et al., "Inductive Representation Learning on Large Graphs",
//! NeurIPS 2017.

use crate::{Error, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use sagre_core::{NeighborSample, NodeEmbedding, NodeId, SubGraph};

/// Pooling function over a neighbor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    /// Average of neighbor embeddings.
    #[default]
    Mean,
    /// Element-wise maximum.
    MaxPool,
    /// Element-wise sum.
    Sum,
}

/// Build a `(nodes, dim)` feature tensor for a node sequence.
///
/// Rows follow input order. Missing features are fatal.
pub(crate) fn rows_tensor(
    features: &NodeEmbedding,
    nodes: &[NodeId],
    device: &Device,
) -> Result<Tensor> {
    let flat = features.gather(nodes)?;
    Ok(Tensor::from_vec(
        flat,
        (nodes.len(), features.dim()),
        device,
    )?)
}

/// One depth level of the aggregation stack.
///
/// Holds exactly one self-transform and one neighbor-transform, both
/// `(input_dim x output_dim)`, created once at model construction and
/// mutated only by gradient updates.
pub struct MeanAggregator {
    lin_self: Linear,
    lin_neighbor: Linear,
    aggregator: Aggregator,
    in_dim: usize,
    out_dim: usize,
}

impl MeanAggregator {
    /// Create a layer with fresh parameters under `vb`'s namespace.
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        aggregator: Aggregator,
        vb: VarBuilder,
    ) -> Result<Self> {
        let lin_self = linear(in_dim, out_dim, vb.pp("self"))?;
        let lin_neighbor = linear(in_dim, out_dim, vb.pp("neighbor"))?;

        Ok(Self {
            lin_self,
            lin_neighbor,
            aggregator,
            in_dim,
            out_dim,
        })
    }

    /// Input dimension.
    pub fn input_dim(&self) -> usize {
        self.in_dim
    }

    /// Output dimension.
    pub fn output_dim(&self) -> usize {
        self.out_dim
    }

    /// Base case (layer 0): previous-level embeddings are the raw input
    /// features, looked up directly for the targets and their freshly
    /// sampled first-order neighbors.
    pub fn forward_input(
        &self,
        nodes: &[NodeId],
        sub_graph: &SubGraph,
        features: &NodeEmbedding,
        fanout: usize,
    ) -> Result<Tensor> {
        let sample = sub_graph.first_order(nodes, fanout)?;
        let device = self.lin_self.weight().device();

        let self_emb = rows_tensor(features, nodes, device)?;
        let neigh_emb = if sample.total() > 0 {
            Some(rows_tensor(features, sample.neighbors(), device)?)
        } else {
            None
        };

        self.aggregate(sample.counts(), &self_emb, neigh_emb.as_ref())
    }

    /// Recursive case (layer > 0): `prev` holds previous-level
    /// embeddings for the targets (rows `0..n`) followed by the sampled
    /// neighbors, grouped by `sample.counts()`.
    pub fn forward(&self, sample: &NeighborSample, prev: &Tensor) -> Result<Tensor> {
        let n = sample.num_queries();
        let (rows, _) = prev.dims2()?;
        if rows != n + sample.total() {
            return Err(Error::Shape(format!(
                "expected {} previous-level rows ({} targets + {} neighbors), got {}",
                n + sample.total(),
                n,
                sample.total(),
                rows
            )));
        }

        let self_emb = prev.narrow(0, 0, n)?;
        let neigh_emb = if sample.total() > 0 {
            Some(prev.narrow(0, n, sample.total())?)
        } else {
            None
        };

        self.aggregate(sample.counts(), &self_emb, neigh_emb.as_ref())
    }

    /// Pool neighbor blocks, combine with the self embedding, apply the
    /// learnable transforms and the nonlinearity.
    fn aggregate(
        &self,
        counts: &[usize],
        self_emb: &Tensor,
        neigh_emb: Option<&Tensor>,
    ) -> Result<Tensor> {
        let pooled = match neigh_emb {
            Some(neigh) => self.pool(counts, neigh)?,
            // A batch of isolated nodes: the neighbor summary is a
            // zero vector, not an error.
            None => Tensor::zeros(
                (counts.len(), self.in_dim),
                DType::F32,
                self_emb.device(),
            )?,
        };

        let h = (self.lin_self.forward(self_emb)? + self.lin_neighbor.forward(&pooled)?)?;
        Ok(h.relu()?)
    }

    fn pool(&self, counts: &[usize], neigh: &Tensor) -> Result<Tensor> {
        let n = counts.len();
        let (total, dim) = neigh.dims2()?;
        let device = neigh.device();

        match self.aggregator {
            Aggregator::Mean | Aggregator::Sum => {
                // One matmul with a block-diagonal pooling matrix keeps
                // the whole reduction on the autograd tape. Isolated
                // nodes get an all-zero row, hence a zero summary.
                let mut weights = vec![0f32; n * total];
                let mut offset = 0;
                for (i, &count) in counts.iter().enumerate() {
                    if count == 0 {
                        continue;
                    }
                    let w = match self.aggregator {
                        Aggregator::Mean => 1.0 / count as f32,
                        _ => 1.0,
                    };
                    for j in offset..offset + count {
                        weights[i * total + j] = w;
                    }
                    offset += count;
                }
                let pool = Tensor::from_vec(weights, (n, total), device)?;
                Ok(pool.matmul(neigh)?)
            }
            Aggregator::MaxPool => {
                let mut rows = Vec::with_capacity(n);
                let mut offset = 0;
                for &count in counts {
                    if count == 0 {
                        rows.push(Tensor::zeros(dim, DType::F32, device)?);
                    } else {
                        rows.push(neigh.narrow(0, offset, count)?.max(0)?);
                        offset += count;
                    }
                }
                Ok(Tensor::stack(&rows, 0)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Var;
    use candle_nn::VarMap;
    use sagre_core::{GraphBuilder, NodeId};

    fn n(id: u64) -> NodeId {
        NodeId::new(id)
    }

    fn test_layer(in_dim: usize, out_dim: usize, aggregator: Aggregator) -> (MeanAggregator, VarMap) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let layer = MeanAggregator::new(in_dim, out_dim, aggregator, vb).unwrap();
        (layer, varmap)
    }

    /// Pin all four parameters so outputs are hand-checkable:
    /// self transform zero, neighbor transform identity.
    fn pin_identity_neighbor(varmap: &VarMap, dim: usize) {
        let data = varmap.data().lock().unwrap();
        let set = |name: &str, value: Tensor| {
            let var: &Var = data.get(name).unwrap();
            var.set(&value).unwrap();
        };

        let eye: Vec<f32> = (0..dim * dim)
            .map(|i| if i % (dim + 1) == 0 { 1.0 } else { 0.0 })
            .collect();
        set(
            "self.weight",
            Tensor::zeros((dim, dim), DType::F32, &Device::Cpu).unwrap(),
        );
        set(
            "self.bias",
            Tensor::zeros(dim, DType::F32, &Device::Cpu).unwrap(),
        );
        set(
            "neighbor.weight",
            Tensor::from_vec(eye, (dim, dim), &Device::Cpu).unwrap(),
        );
        set(
            "neighbor.bias",
            Tensor::zeros(dim, DType::F32, &Device::Cpu).unwrap(),
        );
    }

    #[test]
    fn test_forward_shape() {
        let (layer, _varmap) = test_layer(4, 3, Aggregator::Mean);

        let mut builder = GraphBuilder::new();
        builder.add_undirected_edge(n(0), n(1));
        builder.add_undirected_edge(n(1), n(2));
        let graph = builder.build();
        let sub_graph = SubGraph::new(&graph, 42);

        use rand::SeedableRng;
        let mut features = NodeEmbedding::new(4);
        let nodes = graph.node_set();
        let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(1);
        features.random_init(&nodes, &mut rng);

        let out = layer
            .forward_input(&[n(0), n(1), n(2)], &sub_graph, &features, 5)
            .unwrap();
        assert_eq!(out.dims(), &[3, 3]);
    }

    #[test]
    fn test_mean_of_neighbors_with_pinned_weights() {
        let (layer, varmap) = test_layer(1, 1, Aggregator::Mean);
        pin_identity_neighbor(&varmap, 1);

        // 5-node ring; 1-dim input feature = node id.
        let mut builder = GraphBuilder::new();
        for i in 0..5u64 {
            builder.add_undirected_edge(n(i), n((i + 1) % 5));
        }
        let graph = builder.build();
        let sub_graph = SubGraph::new(&graph, 42);

        let mut features = NodeEmbedding::new(1);
        for i in 0..5u64 {
            features.insert(n(i), vec![i as f32]).unwrap();
        }

        // Node 0 neighbors are 1 and 4; with the neighbor transform
        // pinned to identity the output is relu(mean(1, 4)) = 2.5.
        let out = layer
            .forward_input(&[n(0)], &sub_graph, &features, 5)
            .unwrap();
        let value = out.flatten_all().unwrap().to_vec1::<f32>().unwrap()[0];
        assert!((value - 2.5).abs() < 1e-6, "got {value}");
    }

    #[test]
    fn test_isolated_node_gets_zero_summary() {
        let (layer, varmap) = test_layer(1, 1, Aggregator::Mean);
        pin_identity_neighbor(&varmap, 1);

        let mut builder = GraphBuilder::new();
        builder.add_edge(n(0), n(1));
        let graph = builder.build();
        let sub_graph = SubGraph::new(&graph, 42);

        let mut features = NodeEmbedding::new(1);
        features.insert(n(0), vec![3.0]).unwrap();
        features.insert(n(1), vec![7.0]).unwrap();

        // Node 1 has no outgoing edges: neighbor summary is zero, the
        // self transform is pinned to zero, so the output is 0 and
        // finite - never NaN.
        let out = layer
            .forward_input(&[n(1)], &sub_graph, &features, 5)
            .unwrap();
        let value = out.flatten_all().unwrap().to_vec1::<f32>().unwrap()[0];
        assert_eq!(value, 0.0);
        assert!(value.is_finite());
    }

    #[test]
    fn test_mean_pooling_is_permutation_invariant() {
        let (layer, _varmap) = test_layer(2, 2, Aggregator::Mean);
        let device = Device::Cpu;

        // One target with three neighbors; prev = [self; n1; n2; n3].
        let self_row = vec![0.5f32, -0.25];
        let n1 = vec![1.0f32, 2.0];
        let n2 = vec![-3.0f32, 4.0];
        let n3 = vec![5.0f32, -6.0];

        let build = |order: [&Vec<f32>; 3]| -> Tensor {
            let mut flat = self_row.clone();
            for row in order {
                flat.extend_from_slice(row);
            }
            Tensor::from_vec(flat, (4, 2), &device).unwrap()
        };

        let sample = NeighborSample::new(vec![n(1), n(2), n(3)], vec![3]);

        let a = layer.forward(&sample, &build([&n1, &n2, &n3])).unwrap();
        let b = layer.forward(&sample, &build([&n3, &n1, &n2])).unwrap();

        let a = a.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let b = b.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_max_pooling_is_permutation_invariant() {
        let (layer, _varmap) = test_layer(2, 2, Aggregator::MaxPool);
        let device = Device::Cpu;

        let flat_a = vec![0.0f32, 0.0, 1.0, 8.0, 3.0, -2.0];
        let flat_b = vec![0.0f32, 0.0, 3.0, -2.0, 1.0, 8.0];
        let prev_a = Tensor::from_vec(flat_a, (3, 2), &device).unwrap();
        let prev_b = Tensor::from_vec(flat_b, (3, 2), &device).unwrap();

        let sample = NeighborSample::new(vec![n(1), n(2)], vec![2]);

        let a = layer.forward(&sample, &prev_a).unwrap();
        let b = layer.forward(&sample, &prev_b).unwrap();
        assert_eq!(
            a.flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            b.flatten_all().unwrap().to_vec1::<f32>().unwrap()
        );
    }

    #[test]
    fn test_forward_rejects_wrong_row_count() {
        let (layer, _varmap) = test_layer(2, 2, Aggregator::Mean);
        let prev = Tensor::zeros((2, 2), DType::F32, &Device::Cpu).unwrap();
        let sample = NeighborSample::new(vec![n(1), n(2)], vec![2]);

        // 1 target + 2 neighbors needs 3 rows, not 2.
        assert!(layer.forward(&sample, &prev).is_err());
    }
}
