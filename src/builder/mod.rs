//! Final graph assembly helpers
//!
//! - [`cleanup`]: dead-initializer pruning
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashSet;
//! use onnx_compose::builder::cleanup;
//!
//! // Drop initializers no node reads
//! let kept = cleanup::remove_unused_initializers(&nodes, &initializers, &HashSet::new());
//!
//! // With statistics
//! let (graph, stats) = cleanup::prune_graph(&graph, &HashSet::new());
//! println!("Removed {} initializers", stats.initializers_removed);
//! ```

pub mod cleanup;

// Re-export main types and functions
pub use cleanup::{
    collect_node_inputs, prune_graph, remove_unused_initializers, remove_unused_sparse_initializers,
    PruneStats,
};
