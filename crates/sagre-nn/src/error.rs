use thiserror::Error;

/// Errors that can occur in sagre-nn.
#[derive(Error, Debug)]
pub enum Error {
    /// Failure inside the tensor-execution layer (shape mismatches,
    /// device errors). Propagated as-is; the core makes no retry
    /// decisions.
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
    /// Graph or feature-store error.
    #[error("Graph error: {0}")]
    Graph(#[from] sagre_core::Error),
    /// Model construction rejected (empty layer stack, mismatched
    /// dim/fanout lists).
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),
    /// A batch of targets does not line up with its nodes. Caller
    /// error; never silently truncated.
    #[error("Batch mismatch: {nodes} nodes but {targets} targets")]
    BatchMismatch {
        /// Number of query nodes.
        nodes: usize,
        /// Number of targets supplied.
        targets: usize,
    },
    /// A batch that must not be empty was empty.
    #[error("Empty batch: {0}")]
    EmptyBatch(&'static str),
    /// Tensor arguments disagree about row grouping or dimensions.
    #[error("Shape mismatch: {0}")]
    Shape(String),
    /// No learnable parameter registered under this name.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}

/// Result type alias for sagre-nn.
pub type Result<T> = std::result::Result<T, Error>;
