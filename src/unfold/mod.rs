//! Embedded model unfolding
//!
//! Expands the model nodes of a [`Container`] into their constituent nodes.
//! Each embedded graph is renamed under the model node's name; graph-valued
//! attributes of its nodes (loop and branch bodies) are rewritten under the
//! same prefix, recursively. Opset requirements and local functions of every
//! embedded model are recorded on the outermost container.
//!
//! Unfolding consumes the model nodes: on success the container holds only
//! ordinary nodes, so unfolding it again yields the same nodes and leaves the
//! pools untouched.
//!
//! # Example
//!
//! ```ignore
//! use onnx_compose::unfold::{unfold_model_nodes, Container};
//!
//! let mut container = Container::new();
//! container
//!     .add_model("tokenizer", tokenizer_model)
//!     .add_node(make_node("Cast", &["tokenizer_ids"], &["ids"], "cast"));
//!
//! let nodes = unfold_model_nodes(&mut container)?;
//! ```

pub mod container;

pub use container::{Container, ContainerNode};

use std::collections::HashSet;

use crate::builder::cleanup::prune_graph;
use crate::error::{OnnxResult, TransformError};
use crate::graph::sorted_nodes;
use crate::proto::extensions::make_model;
use crate::proto::{GraphProto, ModelProto, NodeProto, ValueInfoProto};
use crate::rename::rename_graph;

/// Flatten a container into plain nodes.
///
/// Ordinary nodes come first, in insertion order, followed by the renamed
/// nodes of each model node. Renamed initializers, sparse initializers,
/// value info and annotations are pooled on the container, which afterwards
/// holds the flattened nodes in place of its model nodes. On error the
/// container is left unchanged.
pub fn unfold_model_nodes(container: &mut Container) -> OnnxResult<Vec<NodeProto>> {
    check_model_names(&container.nodes)?;

    let mut flat = Vec::with_capacity(container.nodes.len());
    let mut models = Vec::new();
    for entry in &container.nodes {
        match entry {
            ContainerNode::Onnx(node) => flat.push(node.clone()),
            ContainerNode::Model { name, model } => models.push((name.as_str(), model)),
        }
    }

    let mut renamed_graphs = Vec::with_capacity(models.len());
    for &(name, model) in &models {
        let renamed = rename_graph(model.require_graph()?, name)?;
        log::debug!(
            "unfolded model node '{}' into {} nodes",
            name,
            renamed.nodes.len()
        );
        renamed_graphs.push(renamed);
    }

    let mut initializers = Vec::new();
    let mut sparse_initializers = Vec::new();
    let mut value_info = Vec::new();
    let mut annotations = Vec::new();
    for renamed in renamed_graphs {
        flat.extend(renamed.nodes);
        initializers.extend(renamed.initializers);
        sparse_initializers.extend(renamed.sparse_initializers);
        value_info.extend(renamed.value_info);
        annotations.extend(renamed.quantization_annotation);
    }
    check_unique_node_names(&flat)?;

    for &(_, model) in &models {
        for opset in &model.opset_import {
            container.record_opset(&opset.domain, opset.version);
        }
        container.record_functions(model);
    }

    container.initializers.extend(initializers);
    container.sparse_initializers.extend(sparse_initializers);
    container.value_info.extend(value_info);
    container.quantization_annotation.extend(annotations);
    container.nodes = flat.iter().cloned().map(ContainerNode::Onnx).collect();
    Ok(flat)
}

/// Model node names prefix everything they inline; they must be present and unique
fn check_model_names(nodes: &[ContainerNode]) -> OnnxResult<()> {
    let mut seen = HashSet::new();
    for entry in nodes.iter().filter(|e| e.is_model()) {
        let name = entry.name();
        if name.is_empty() {
            return Err(TransformError::NamingContractViolation(
                "model node without a name cannot be unfolded".to_string(),
            ));
        }
        if !seen.insert(name) {
            return Err(TransformError::NamingContractViolation(format!(
                "model node name '{}' is used more than once",
                name
            )));
        }
    }
    Ok(())
}

fn check_unique_node_names(nodes: &[NodeProto]) -> OnnxResult<()> {
    let mut seen = HashSet::new();
    for node in nodes.iter().filter(|n| !n.name.is_empty()) {
        if !seen.insert(node.name.as_str()) {
            return Err(TransformError::NamingContractViolation(format!(
                "prefixing produced a duplicate node name '{}'",
                node.name
            )));
        }
    }
    Ok(())
}

/// Unfold a root container and assemble a model from it.
///
/// Unused initializers are pruned (declared outputs always survive), nodes
/// are topologically sorted, and the container's opset requirements and
/// local functions become the model's.
pub fn build_model(
    container: &mut Container,
    name: &str,
    inputs: Vec<ValueInfoProto>,
    outputs: Vec<ValueInfoProto>,
) -> OnnxResult<ModelProto> {
    if !container.is_root() {
        return Err(TransformError::InvalidModel(
            "only the outermost container owns the opset imports".to_string(),
        ));
    }

    let nodes = unfold_model_nodes(container)?;
    let graph = GraphProto {
        node: nodes,
        name: name.to_string(),
        initializer: container.initializers.clone(),
        sparse_initializer: container.sparse_initializers.clone(),
        input: inputs,
        output: outputs,
        value_info: container.value_info.clone(),
        quantization_annotation: container.quantization_annotation.clone(),
        ..Default::default()
    };
    let (mut graph, stats) = prune_graph(&graph, &HashSet::new());
    log::debug!(
        "model '{}' keeps {} initializers",
        name,
        stats.initializers_kept
    );
    graph.node = sorted_nodes(&graph)?;

    let mut model = make_model(graph, container.opset_imports());
    model.functions = container.functions();
    Ok(model)
}
