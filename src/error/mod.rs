//! Error types for onnx-compose
//!
//! This module defines all error types used throughout the crate. Every error
//! is fatal at the point of detection: callers fix the input graphs (or the
//! port-mapping function) and invoke the operation again.

use thiserror::Error;

/// Main error type for graph composition operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// A node input names a tensor that nothing produces
    #[error("{node}: cannot find an operator to produce the tensor: {tensor}")]
    DanglingReference {
        /// Name of the consuming node (or the graph output slot)
        node: String,
        /// Tensor name without a producer
        tensor: String,
    },

    /// The node dependency graph is not a DAG
    #[error("graph is not a DAG, the cycle is found at {node}")]
    CycleDetected {
        /// Node at which the traversal re-entered an unfinished node
        node: String,
    },

    /// A name required to be present and unique is missing or duplicated
    #[error("naming contract violated: {0}")]
    NamingContractViolation(String),

    /// Default positional wiring found no output at the required index
    #[error(
        "cannot wire input #{input_index} of graph {graph}: the previous graph has only {available} outputs"
    )]
    ArityMismatch {
        /// Position (0-based) of the consuming graph in the join list
        graph: usize,
        /// Index of the declared input that needed a producer
        input_index: usize,
        /// Number of outputs declared by the preceding graph
        available: usize,
    },

    /// Invalid node configuration
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Invalid model
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protobuf decode error
    #[error("Protobuf decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),
}

/// Result type alias for ONNX operations
pub type OnnxResult<T> = Result<T, TransformError>;
