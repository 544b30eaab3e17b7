//! # ONNX Compose
//!
//! Graph rewriting engine for composing ONNX models.
//!
//! This crate merges independently authored ONNX graphs into one well-formed
//! graph: identifiers are prefixed to avoid collisions, tensor ports are
//! wired between graphs, dead initializers are pruned and nodes are
//! topologically ordered with cycle detection.
//!
//! ## Features
//!
//! - **Renaming**: collision-free prefixing of nodes, tensors and nested bodies
//! - **Unfolding**: inline embedded models and propagate their opsets
//! - **Ordering**: topological sort with dangling-reference and cycle errors
//! - **Composition**: join N models with positional or custom port wiring
//! - **Library**: carry local functions and metadata into composed models
//!
//! ## Example
//!
//! ```ignore
//! use onnx_compose::prelude::*;
//!
//! let pre = load_model("pre.onnx")?;
//! let net = load_model("net.onnx")?;
//! let joined = join_models(&[pre, net])?;
//! save_model(&joined, "pipeline.onnx")?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Module declarations
// ============================================================================

pub mod builder;
pub mod compose;
pub mod error;
pub mod graph;
pub mod io;
pub mod library;
pub mod opset;
pub mod proto;
pub mod rename;
pub mod unfold;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module - import commonly used types with `use onnx_compose::prelude::*`
pub mod prelude {
    pub use crate::builder::remove_unused_initializers;
    pub use crate::compose::{join_models, join_models_with, ModelJoiner, ModelPort, PortMapping};
    pub use crate::error::{OnnxResult, TransformError};
    pub use crate::graph::{sort_graph, topological_sort, DependencyGraph};
    pub use crate::io::{load_model, save_model};
    pub use crate::library::{union_functions, FunctionSet};
    pub use crate::opset::{union_opsets, OpsetSet};
    pub use crate::proto::onnx::*;
    pub use crate::rename::{merge_name, rename_graph};
    pub use crate::unfold::{unfold_model_nodes, Container, ContainerNode};
}

// ============================================================================
// Crate-level re-exports
// ============================================================================

pub use compose::{join_models, join_models_with, ModelJoiner};
pub use error::{OnnxResult, TransformError};

// ============================================================================
// Version information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// IR version stamped on models built from scratch
pub const IR_VERSION: i64 = 8;
