#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]

//! Core graph types for inductive representation learning.
//!
//! This crate provides the data side of GraphSAGE training:
//!
//! - [`Graph`] / [`GraphBuilder`] - immutable directed topology over
//!   integer node ids
//! - [`NodeEmbedding`] - input feature store, mutable only at init time
//! - [`SubGraph`] - bounded first-order neighbor sampling with a
//!   seedable, owned random source
//! - [`loaders`] - whitespace edge-list / feature / label file readers
//!
//! # Example
//!
//! ```rust
//! use sagre_core::{GraphBuilder, NodeId, SubGraph};
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_undirected_edge(NodeId::new(0), NodeId::new(1));
//! builder.add_undirected_edge(NodeId::new(1), NodeId::new(2));
//! let graph = builder.build();
//!
//! let sub_graph = SubGraph::new(&graph, 42);
//! let sample = sub_graph.first_order(&[NodeId::new(1)], 5).unwrap();
//! assert_eq!(sample.counts(), &[2]);
//! ```

mod embedding;
mod error;
mod graph;
pub mod loaders;
mod node;
pub mod sampling;

pub use embedding::NodeEmbedding;
pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder, GraphStats};
pub use node::NodeId;
pub use sampling::{
    negative_sampling, NeighborSample, ReplacementSampler, SamplingPolicy, SubGraph,
    UniformSampler,
};
