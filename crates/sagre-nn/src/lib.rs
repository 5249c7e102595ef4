#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]

//! GraphSAGE layers, models and training loops.
//!
//! GraphSAGE (Hamilton et al., 2017) learns aggregation functions
//! instead of per-node lookup tables, so it can embed nodes never seen
//! during training. This crate implements:
//!
//! - [`MeanAggregator`] - one learnable aggregation layer
//! - [`SupervisedGraphSage`] - classification head, NLL training
//! - [`UnSupervisedGraphSage`] - pairwise edge objective, no head
//! - [`training`] - the batch/epoch driver and SGD plumbing
//!
//! Tensors, autograd and the optimizer come from candle; this crate
//! only builds the computation and hands gradient maps back.
//!
//! # Example
//!
//! ```rust,no_run
//! use candle_core::Device;
//! use sagre_core::{GraphBuilder, NodeEmbedding, NodeId, SubGraph};
//! use sagre_nn::{Aggregator, EdgeDataset, TrainingConfig, UnSupervisedGraphSage};
//! use sagre_nn::training::train_unsupervised;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rand::SeedableRng;
//! let mut builder = GraphBuilder::new();
//! builder.add_undirected_edge(NodeId::new(0), NodeId::new(1));
//! builder.add_undirected_edge(NodeId::new(1), NodeId::new(2));
//! let graph = builder.build();
//!
//! let mut features = NodeEmbedding::new(16);
//! let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(42);
//! features.random_init(&graph.node_set(), &mut rng);
//!
//! let sub_graph = SubGraph::new(&graph, 42);
//! let model = UnSupervisedGraphSage::new(
//!     16, &[20, 10], &[5, 5], Aggregator::Mean, &Device::Cpu,
//! )?;
//!
//! let dataset = EdgeDataset::from_graph(&graph);
//! let history = train_unsupervised(
//!     &model, &sub_graph, &features, &dataset, &TrainingConfig::default(),
//! )?;
//! println!("final loss {}", history.last().unwrap());
//! # Ok(())
//! # }
//! ```

pub mod dataset;
mod error;
pub mod layer;
pub mod loss;
pub mod metrics;
mod model;
pub mod training;

pub use dataset::{Batches, EdgeDataset, NodeLabelDataset};
pub use error::{Error, Result};
pub use layer::{Aggregator, MeanAggregator};
pub use loss::{pairwise_loss, pairwise_loss_with_negatives};
pub use model::{Gradients, SageEncoder, SupervisedGraphSage, UnSupervisedGraphSage};
pub use training::{evaluate, train_supervised, train_unsupervised, TrainingConfig};
