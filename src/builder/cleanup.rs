//! Dead-initializer pruning
//!
//! Functions for dropping initializers no surviving node reads. Node outputs
//! are never pruned here; only constant tensors are, dense or sparse.

use std::collections::HashSet;

use crate::proto::{GraphProto, NodeProto, SparseTensorProto, TensorProto};

/// Collect every tensor name read by the nodes, including nodes of nested graphs
pub fn collect_node_inputs(nodes: &[NodeProto]) -> HashSet<&str> {
    let mut used = HashSet::new();
    collect_into(nodes, &mut used);
    used
}

fn collect_into<'a>(nodes: &'a [NodeProto], used: &mut HashSet<&'a str>) {
    for node in nodes {
        used.extend(node.bound_inputs());

        for attr in &node.attribute {
            if let Some(g) = &attr.g {
                collect_into(&g.node, used);
            }
            for g in &attr.graphs {
                collect_into(&g.node, used);
            }
        }
    }
}

/// Keep initializers referenced by at least one node or named in `keep`
pub fn remove_unused_initializers(
    nodes: &[NodeProto],
    initializers: &[TensorProto],
    keep: &HashSet<String>,
) -> Vec<TensorProto> {
    let used = collect_node_inputs(nodes);

    initializers
        .iter()
        .filter(|t| used.contains(t.name.as_str()) || keep.contains(&t.name))
        .cloned()
        .collect()
}

/// Sparse counterpart of [`remove_unused_initializers`]
pub fn remove_unused_sparse_initializers(
    nodes: &[NodeProto],
    initializers: &[SparseTensorProto],
    keep: &HashSet<String>,
) -> Vec<SparseTensorProto> {
    let used = collect_node_inputs(nodes);

    initializers
        .iter()
        .filter(|s| {
            let name = s.values.as_ref().map(|t| t.name.as_str()).unwrap_or_default();
            used.contains(name) || keep.contains(name)
        })
        .cloned()
        .collect()
}

/// Statistics from a pruning pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    /// Number of initializers kept
    pub initializers_kept: usize,
    /// Number of initializers removed
    pub initializers_removed: usize,
    /// Number of sparse initializers removed
    pub sparse_initializers_removed: usize,
}

/// Copy of a graph without dead initializers, plus statistics.
///
/// Declared graph outputs are always kept, in addition to `keep`.
pub fn prune_graph(graph: &GraphProto, keep: &HashSet<String>) -> (GraphProto, PruneStats) {
    let mut keep = keep.clone();
    keep.extend(graph.output.iter().map(|vi| vi.name.clone()));

    let initializer = remove_unused_initializers(&graph.node, &graph.initializer, &keep);
    let sparse_initializer =
        remove_unused_sparse_initializers(&graph.node, &graph.sparse_initializer, &keep);
    let stats = PruneStats {
        initializers_kept: initializer.len(),
        initializers_removed: graph.initializer.len().saturating_sub(initializer.len()),
        sparse_initializers_removed: graph
            .sparse_initializer
            .len()
            .saturating_sub(sparse_initializer.len()),
    };

    (
        GraphProto {
            initializer,
            sparse_initializer,
            ..graph.clone()
        },
        stats,
    )
}
