//! GraphSAGE models: the recursive multi-layer forward pass plus the
//! supervised and unsupervised output surfaces.
//!
//! Both variants share [`SageEncoder`], which owns the ordered
//! aggregation-layer stack and walks it recursively: the deepest layer
//! queries first-order neighbors of the batch roots, the level below
//! queries neighbors-of-neighbors, and so on down to layer 0, which
//! reads raw input features. The recursion unwinds by aggregating, so
//! layer `i` always completes before layer `i + 1`.
//!
//! Per root node the effective neighborhood queried at depth `k`
//! multiplies by `fanouts[k]`, keeping total work at
//! `O(prod fanouts)` - independent of graph size.

use crate::layer::{Aggregator, MeanAggregator};
use crate::{Error, Result};
use candle_core::backprop::GradStore;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{linear_no_bias, loss, ops, Linear, Module, VarBuilder, VarMap};
use sagre_core::{NodeEmbedding, NodeId, SubGraph};
use std::collections::HashMap;

/// Clamp floor for row norms, so degenerate (e.g. isolated) nodes
/// divide by a tiny constant instead of ~0.
const NORM_EPS: f64 = 1e-15;

/// L2-normalize each row, with the denominator floored at [`NORM_EPS`].
fn normalize_rows(output: &Tensor) -> Result<Tensor> {
    let norm = output
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .maximum(NORM_EPS)?;
    Ok(output.broadcast_div(&norm)?)
}

/// The ordered aggregation-layer stack shared by both model variants.
///
/// `layers[0]` is closest to the input features; `layers[L-1]` produces
/// the final representation. Dimensions chain by construction:
/// `layers[i].output_dim == layers[i + 1].input_dim`.
pub struct SageEncoder {
    layers: Vec<MeanAggregator>,
    fanouts: Vec<usize>,
}

impl SageEncoder {
    /// Build a stack of `output_dims.len()` layers.
    ///
    /// `fanouts[i]` caps the neighbors sampled when layer `i` queries
    /// the graph. Both lists must be non-empty and the same length -
    /// the layer count also bounds the recursion depth, so it is
    /// validated here rather than trusted at call time.
    pub fn new(
        input_dim: usize,
        output_dims: &[usize],
        fanouts: &[usize],
        aggregator: Aggregator,
        vb: VarBuilder,
    ) -> Result<Self> {
        if output_dims.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one aggregation layer is required".to_string(),
            ));
        }
        if output_dims.len() != fanouts.len() {
            return Err(Error::InvalidConfig(format!(
                "{} layer dims but {} fanouts",
                output_dims.len(),
                fanouts.len()
            )));
        }

        let mut layers = Vec::with_capacity(output_dims.len());
        let mut in_dim = input_dim;
        for (i, &out_dim) in output_dims.iter().enumerate() {
            layers.push(MeanAggregator::new(
                in_dim,
                out_dim,
                aggregator,
                vb.pp(format!("layers.{i}")),
            )?);
            in_dim = out_dim;
        }

        Ok(Self {
            layers,
            fanouts: fanouts.to_vec(),
        })
    }

    /// Number of aggregation layers (= recursion depth).
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Input feature dimension.
    pub fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    /// Final representation dimension.
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].output_dim()
    }

    /// Recursive multi-layer forward.
    ///
    /// At `layer > 0` the targets' first-order neighbors are sampled,
    /// the previous level is computed for targets-plus-neighbors (the
    /// target rows ride along so the layer can combine its own
    /// previous-level embedding with the pooled neighbor summary), and
    /// the layer aggregates. Layer 0 reads raw input features.
    fn compute_output(
        &self,
        nodes: &[NodeId],
        layer: usize,
        sub_graph: &SubGraph,
        features: &NodeEmbedding,
    ) -> Result<Tensor> {
        let fanout = self.fanouts[layer];
        if layer == 0 {
            self.layers[0].forward_input(nodes, sub_graph, features, fanout)
        } else {
            let sample = sub_graph.first_order(nodes, fanout)?;
            let mut prev_nodes = nodes.to_vec();
            prev_nodes.extend_from_slice(sample.neighbors());
            let prev = self.compute_output(&prev_nodes, layer - 1, sub_graph, features)?;
            self.layers[layer].forward(&sample, &prev)
        }
    }

    /// Final-layer embeddings for `nodes`, L2-normalized row-wise.
    ///
    /// Rows follow `nodes` order. Fresh on every call - neighbor
    /// sampling is stochastic per call, so nothing is cached.
    pub fn encode(
        &self,
        nodes: &[NodeId],
        sub_graph: &SubGraph,
        features: &NodeEmbedding,
    ) -> Result<Tensor> {
        let output = self.compute_output(nodes, self.layers.len() - 1, sub_graph, features)?;
        normalize_rows(&output)
    }
}

/// Gradients from one backward pass.
///
/// Holds the name -> gradient mapping (one entry per learnable weight
/// that contributed to the loss; disconnected parameters are omitted,
/// not zero-filled) plus the backing gradient store the optimizer steps
/// from.
#[derive(Debug)]
pub struct Gradients {
    loss: f32,
    store: GradStore,
    named: HashMap<String, Tensor>,
}

impl Gradients {
    /// Scalar loss value for this batch.
    pub fn loss(&self) -> f32 {
        self.loss
    }

    /// Gradient for one parameter, if it contributed to the loss.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.named.get(name)
    }

    /// The full name -> gradient mapping.
    pub fn named(&self) -> &HashMap<String, Tensor> {
        &self.named
    }

    /// Parameter names with gradients, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The backing gradient store, for the optimizer's `step`.
    pub fn grad_store(&self) -> &GradStore {
        &self.store
    }
}

/// Collect name -> gradient pairs for every parameter the store holds.
fn collect_named(varmap: &VarMap, store: &GradStore) -> HashMap<String, Tensor> {
    let data = varmap.data().lock().expect("parameter registry poisoned");
    let mut named = HashMap::new();
    for (name, var) in data.iter() {
        if let Some(grad) = store.get(var.as_tensor()) {
            named.insert(name.clone(), grad.clone());
        }
    }
    named
}

fn lookup_parameter(varmap: &VarMap, name: &str) -> Result<candle_core::Var> {
    let data = varmap.data().lock().expect("parameter registry poisoned");
    data.get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownParameter(name.to_string()))
}

fn parameter_snapshot(varmap: &VarMap) -> HashMap<String, Tensor> {
    let data = varmap.data().lock().expect("parameter registry poisoned");
    data.iter()
        .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
        .collect()
}

fn sorted_names(varmap: &VarMap) -> Vec<String> {
    let data = varmap.data().lock().expect("parameter registry poisoned");
    let mut names: Vec<String> = data.keys().cloned().collect();
    names.sort_unstable();
    names
}

/// GraphSAGE for node classification.
///
/// The encoder output is L2-normalized, projected through the output
/// weight matrix `(final_dim x num_classes)` and rectified; training
/// uses negative log-likelihood over log-softmax logits.
pub struct SupervisedGraphSage {
    encoder: SageEncoder,
    out: Linear,
    varmap: VarMap,
    device: Device,
}

impl std::fmt::Debug for SupervisedGraphSage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisedGraphSage")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl SupervisedGraphSage {
    /// Create a model with fresh parameters on `device`.
    pub fn new(
        input_dim: usize,
        num_classes: usize,
        output_dims: &[usize],
        fanouts: &[usize],
        aggregator: Aggregator,
        device: &Device,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::InvalidConfig(
                "num_classes must be positive".to_string(),
            ));
        }

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let encoder = SageEncoder::new(input_dim, output_dims, fanouts, aggregator, vb.clone())?;
        let out = linear_no_bias(encoder.output_dim(), num_classes, vb.pp("out"))?;

        Ok(Self {
            encoder,
            out,
            varmap,
            device: device.clone(),
        })
    }

    /// Input feature dimension.
    pub fn input_dim(&self) -> usize {
        self.encoder.input_dim()
    }

    /// Per-class logits for each node, row order preserved.
    pub fn forward(
        &self,
        nodes: &[NodeId],
        sub_graph: &SubGraph,
        features: &NodeEmbedding,
    ) -> Result<Tensor> {
        let embedded = self.encoder.encode(nodes, sub_graph, features)?;
        Ok(self.out.forward(&embedded)?.relu()?)
    }

    /// Forward, loss and gradient computation for one batch.
    ///
    /// `targets[i]` is the integer class of `nodes[i]`; a length
    /// mismatch is a caller error and fails loudly.
    pub fn backward(
        &self,
        nodes: &[NodeId],
        sub_graph: &SubGraph,
        features: &NodeEmbedding,
        targets: &[u32],
    ) -> Result<Gradients> {
        if targets.len() != nodes.len() {
            return Err(Error::BatchMismatch {
                nodes: nodes.len(),
                targets: targets.len(),
            });
        }
        if nodes.is_empty() {
            return Err(Error::EmptyBatch("supervised backward"));
        }

        let logits = self.forward(nodes, sub_graph, features)?;
        let log_probs = ops::log_softmax(&logits, D::Minus1)?;
        let target_tensor = Tensor::from_vec(targets.to_vec(), targets.len(), &self.device)?;
        let batch_loss = loss::nll(&log_probs, &target_tensor)?;

        let store = batch_loss.backward()?;
        let named = collect_named(&self.varmap, &store);

        Ok(Gradients {
            loss: batch_loss.to_scalar::<f32>()?,
            store,
            named,
        })
    }

    /// Names of every learnable parameter, sorted.
    pub fn parameter_names(&self) -> Vec<String> {
        sorted_names(&self.varmap)
    }

    /// Snapshot of every parameter tensor by name.
    pub fn parameters(&self) -> HashMap<String, Tensor> {
        parameter_snapshot(&self.varmap)
    }

    /// Overwrite one parameter in place (e.g. weights pulled from a
    /// parameter server).
    pub fn set_parameter(&self, name: &str, value: &Tensor) -> Result<()> {
        let var = lookup_parameter(&self.varmap, name)?;
        var.set(value)?;
        Ok(())
    }

    /// All learnable parameters, for the external optimizer.
    pub fn all_vars(&self) -> Vec<candle_core::Var> {
        self.varmap.all_vars()
    }
}

/// GraphSAGE trained without labels, via a pairwise edge objective.
///
/// No output head: `forward` returns the L2-normalized final-layer
/// embeddings directly. Batch construction (source half / destination
/// half of sampled edges) is the training driver's job.
pub struct UnSupervisedGraphSage {
    encoder: SageEncoder,
    varmap: VarMap,
}

impl UnSupervisedGraphSage {
    /// Create a model with fresh parameters on `device`.
    pub fn new(
        input_dim: usize,
        output_dims: &[usize],
        fanouts: &[usize],
        aggregator: Aggregator,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let encoder = SageEncoder::new(input_dim, output_dims, fanouts, aggregator, vb)?;

        Ok(Self { encoder, varmap })
    }

    /// Input feature dimension.
    pub fn input_dim(&self) -> usize {
        self.encoder.input_dim()
    }

    /// Embedding dimension of the final layer.
    pub fn output_dim(&self) -> usize {
        self.encoder.output_dim()
    }

    /// L2-normalized embeddings for a flat batch of node ids, row order
    /// preserved.
    pub fn forward(
        &self,
        nodes: &[NodeId],
        sub_graph: &SubGraph,
        features: &NodeEmbedding,
    ) -> Result<Tensor> {
        self.encoder.encode(nodes, sub_graph, features)
    }

    /// Contrastive loss over true edge endpoint embeddings.
    ///
    /// See [`crate::pairwise_loss`].
    pub fn pairwise_loss(&self, src: &Tensor, dst: &Tensor) -> Result<Tensor> {
        crate::loss::pairwise_loss(src, dst)
    }

    /// Names of every learnable parameter, sorted.
    pub fn parameter_names(&self) -> Vec<String> {
        sorted_names(&self.varmap)
    }

    /// Snapshot of every parameter tensor by name.
    pub fn parameters(&self) -> HashMap<String, Tensor> {
        parameter_snapshot(&self.varmap)
    }

    /// Overwrite one parameter in place.
    pub fn set_parameter(&self, name: &str, value: &Tensor) -> Result<()> {
        let var = lookup_parameter(&self.varmap, name)?;
        var.set(value)?;
        Ok(())
    }

    /// All learnable parameters, for the external optimizer.
    pub fn all_vars(&self) -> Vec<candle_core::Var> {
        self.varmap.all_vars()
    }
}
