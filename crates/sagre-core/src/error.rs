use crate::NodeId;
use thiserror::Error;

/// Errors that can occur in sagre-core.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Node id not present in the graph or feature store.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    /// Feature vector length does not match the store dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },
    /// Malformed line in an input file.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
}

/// Result type alias for sagre-core.
pub type Result<T> = std::result::Result<T, Error>;
