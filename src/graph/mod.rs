//! Graph dependency analysis
//!
//! This module provides the infrastructure for reasoning about producer and
//! consumer edges in ONNX graphs:
//!
//! - [`maps`]: typed producer index (tensor name → producer)
//! - [`toposort`]: dependency graph, topological ordering and cycle detection
//!
//! # Example
//!
//! ```ignore
//! use onnx_compose::graph::{sort_graph, DependencyGraph};
//!
//! // Reorder nodes so producers precede consumers
//! let sorted = sort_graph(&graph)?;
//!
//! // Inspect edges directly
//! let deps = DependencyGraph::from_graph(&graph)?;
//! for (producer, consumer) in deps.edges() {
//!     println!("{} -> {}", deps.node(producer).name, deps.node(consumer).name);
//! }
//! ```
//!
//! # Tiers
//!
//! | Tier | Members |
//! |------|---------|
//! | placeholder | graph inputs, initializers |
//! | roots | `Constant` nodes, then nodes not reached otherwise |
//! | nodes | everything else, after all of its producers |

pub mod maps;
pub mod toposort;

// Re-export main types
pub use maps::{display_name, subgraph_references, GraphScope, NodeId, Producer, ProducerIndex};
pub use toposort::{
    is_topologically_sorted, sort_graph, sorted_nodes, topological_sort, DependencyGraph,
    Successors,
};
