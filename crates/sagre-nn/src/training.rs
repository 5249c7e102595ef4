//! Training driver: batches queries, invokes forward/backward, steps
//! the optimizer and reports per-batch and per-epoch metrics.
//!
//! The driver is the only place where weight updates happen, and each
//! batch fully completes (forward, backward, step) before the next
//! begins; forward passes never overlap an optimizer step.

use crate::dataset::{EdgeDataset, NodeLabelDataset};
use crate::loss::pairwise_loss;
use crate::metrics::accuracy;
use crate::model::{SupervisedGraphSage, UnSupervisedGraphSage};
use crate::{Error, Result};
use candle_nn::{Optimizer, SGD};
use sagre_core::{NodeEmbedding, SubGraph};

/// Training hyperparameters.
///
/// Defaults: batches of 1024, 5 epochs, plain SGD at 0.01.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Examples per batch (edges or labeled nodes).
    pub batch_size: usize,
    /// Number of passes over the dataset.
    pub epochs: usize,
    /// Fixed SGD learning rate.
    pub learning_rate: f64,
    /// Seed for batch shuffling.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            epochs: 5,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Train a supervised model; returns the per-epoch mean loss.
///
/// Each batch goes through the model's `backward` (which yields the
/// name -> gradient map) and the SGD step is applied from the backing
/// gradient store.
pub fn train_supervised(
    model: &SupervisedGraphSage,
    sub_graph: &SubGraph,
    features: &NodeEmbedding,
    dataset: &NodeLabelDataset,
    config: &TrainingConfig,
) -> Result<Vec<f32>> {
    if dataset.is_empty() {
        return Err(Error::EmptyBatch("supervised training dataset"));
    }

    let mut optim = SGD::new(model.all_vars(), config.learning_rate)?;
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let mut loss_sum = 0.0f64;
        let mut seen = 0usize;

        let batches = dataset.shuffled_batches(config.batch_size, config.seed + epoch as u64);
        for (batch_index, batch) in batches.enumerate() {
            let (nodes, targets): (Vec<_>, Vec<_>) = batch.into_iter().unzip();

            let grads = model.backward(&nodes, sub_graph, features, &targets)?;
            optim.step(grads.grad_store())?;

            let loss = grads.loss();
            loss_sum += f64::from(loss) * nodes.len() as f64;
            seen += nodes.len();

            println!(
                "epoch {} batch_index={} batch_size={} loss={}",
                epoch,
                batch_index,
                nodes.len(),
                loss
            );
        }

        let epoch_loss = (loss_sum / seen as f64) as f32;
        println!("epoch {} loss={}", epoch, epoch_loss);
        history.push(epoch_loss);
    }

    Ok(history)
}

/// Classification accuracy of a trained model over a labeled dataset,
/// evaluated in batches.
pub fn evaluate(
    model: &SupervisedGraphSage,
    sub_graph: &SubGraph,
    features: &NodeEmbedding,
    dataset: &NodeLabelDataset,
    batch_size: usize,
) -> Result<f32> {
    if dataset.is_empty() {
        return Err(Error::EmptyBatch("evaluation dataset"));
    }

    let mut correct = 0.0f64;
    let mut seen = 0usize;

    for chunk in dataset.examples().chunks(batch_size.max(1)) {
        let (nodes, targets): (Vec<_>, Vec<_>) = chunk.iter().copied().unzip();
        let logits = model.forward(&nodes, sub_graph, features)?;
        correct += f64::from(accuracy(&logits, &targets)?) * nodes.len() as f64;
        seen += nodes.len();
    }

    Ok((correct / seen as f64) as f32)
}

/// Train an unsupervised model on sampled edges; returns the per-epoch
/// mean loss.
///
/// A batch of `E` edges becomes a flat forward batch
/// `[src_0..src_E, dst_0..dst_E]`; the output is split in half and the
/// two halves feed the pairwise loss; batch construction is the
/// driver's job, not the model's.
pub fn train_unsupervised(
    model: &UnSupervisedGraphSage,
    sub_graph: &SubGraph,
    features: &NodeEmbedding,
    dataset: &EdgeDataset,
    config: &TrainingConfig,
) -> Result<Vec<f32>> {
    if dataset.is_empty() {
        return Err(Error::EmptyBatch("unsupervised training dataset"));
    }

    let mut optim = SGD::new(model.all_vars(), config.learning_rate)?;
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let mut loss_sum = 0.0f64;
        let mut seen = 0usize;

        let batches = dataset.shuffled_batches(config.batch_size, config.seed + epoch as u64);
        for (batch_index, batch) in batches.enumerate() {
            let num_edges = batch.len();
            let mut nodes = Vec::with_capacity(num_edges * 2);
            nodes.extend(batch.iter().map(|&(src, _)| src));
            nodes.extend(batch.iter().map(|&(_, dst)| dst));

            let output = model.forward(&nodes, sub_graph, features)?;
            let srcs = output.narrow(0, 0, num_edges)?;
            let dsts = output.narrow(0, num_edges, num_edges)?;

            let batch_loss = pairwise_loss(&srcs, &dsts)?;
            optim.backward_step(&batch_loss)?;

            let loss = batch_loss.to_scalar::<f32>()?;
            loss_sum += f64::from(loss) * num_edges as f64;
            seen += num_edges;

            println!(
                "epoch {} batch_index={} batch_size={} loss={}",
                epoch, batch_index, num_edges, loss
            );
        }

        let epoch_loss = (loss_sum / seen as f64) as f32;
        println!("epoch {} loss={}", epoch, epoch_loss);
        history.push(epoch_loss);
    }

    Ok(history)
}
