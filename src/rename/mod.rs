//! Prefix-based identifier renaming
//!
//! Every non-empty name `n` becomes `prefix_n`. Empty tensor references mark
//! unused optional slots and stay empty; empty node names are synthesized as
//! `prefix_op<index>` from the node's position in its source sequence.
//!
//! All functions borrow their input and return renamed copies, except
//! [`rename_in_place`], which rewrites the declared inputs/outputs of a graph
//! that is about to be emitted.
//!
//! # Example
//!
//! ```ignore
//! use onnx_compose::rename::{merge_name, rename_graph};
//!
//! assert_eq!(merge_name("g1", "x"), "g1_x");
//! let renamed = rename_graph(&graph, "g1")?;
//! ```

use rustc_hash::FxHashSet;

use crate::error::OnnxResult;
use crate::proto::extensions::AttributeValue;
use crate::proto::{
    AttributeProto, GraphProto, NodeDeviceConfigurationProto, NodeProto, SparseTensorProto,
    StringStringEntryProto, TensorAnnotation, TensorProto, ValueInfoProto,
};

/// Join a prefix and a name with `_`
pub fn merge_name(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}

/// Prefix a tensor reference, leaving empty optional slots untouched
pub fn rename_reference(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        merge_name(prefix, name)
    }
}

/// Renamed copies of value-info records
pub fn rename_value_infos(values: &[ValueInfoProto], prefix: &str) -> Vec<ValueInfoProto> {
    values
        .iter()
        .map(|vi| ValueInfoProto {
            name: rename_reference(prefix, &vi.name),
            ..vi.clone()
        })
        .collect()
}

/// Renamed copies of initializers
pub fn rename_initializers(tensors: &[TensorProto], prefix: &str) -> Vec<TensorProto> {
    tensors.iter().map(|t| rename_tensor(t, prefix)).collect()
}

fn rename_tensor(tensor: &TensorProto, prefix: &str) -> TensorProto {
    TensorProto {
        name: rename_reference(prefix, &tensor.name),
        ..tensor.clone()
    }
}

/// Renamed copies of sparse initializers; the tensor name lives on `values`
pub fn rename_sparse_initializers(
    tensors: &[SparseTensorProto],
    prefix: &str,
) -> Vec<SparseTensorProto> {
    tensors
        .iter()
        .map(|sparse| SparseTensorProto {
            values: sparse.values.as_ref().map(|t| rename_tensor(t, prefix)),
            indices: sparse.indices.as_ref().map(|t| rename_tensor(t, prefix)),
            dims: sparse.dims.clone(),
        })
        .collect()
}

/// Renamed copies of quantization annotations.
///
/// Both the annotated tensor and the quantization parameter tensors it points
/// to are graph tensors.
pub fn rename_annotations(annotations: &[TensorAnnotation], prefix: &str) -> Vec<TensorAnnotation> {
    annotations
        .iter()
        .map(|a| TensorAnnotation {
            tensor_name: rename_reference(prefix, &a.tensor_name),
            quant_parameter_tensor_names: a
                .quant_parameter_tensor_names
                .iter()
                .map(|entry| StringStringEntryProto {
                    key: entry.key.clone(),
                    value: rename_reference(prefix, &entry.value),
                })
                .collect(),
        })
        .collect()
}

/// Rename declared inputs or outputs in place
pub fn rename_in_place(values: &mut [ValueInfoProto], prefix: &str) {
    for vi in values.iter_mut() {
        vi.name = rename_reference(prefix, &vi.name);
    }
}

/// Renamed copy of a node at position `index` of its source sequence.
///
/// Graph-valued attributes are rewritten under the same prefix so that body
/// nodes keep referring to the renamed outer-scope tensors.
pub fn rename_node(node: &NodeProto, prefix: &str, index: usize) -> OnnxResult<NodeProto> {
    let local = if node.name.is_empty() {
        format!("op{}", index)
    } else {
        node.name.clone()
    };
    rename_node_as(node, prefix, &local)
}

fn rename_node_as(node: &NodeProto, prefix: &str, local: &str) -> OnnxResult<NodeProto> {
    let attribute = node
        .attribute
        .iter()
        .map(|attr| rename_attribute(attr, prefix))
        .collect::<OnnxResult<Vec<_>>>()?;

    Ok(NodeProto {
        name: merge_name(prefix, local),
        input: node.input.iter().map(|n| rename_reference(prefix, n)).collect(),
        output: node
            .output
            .iter()
            .map(|n| rename_reference(prefix, n))
            .collect(),
        attribute,
        device_configurations: rename_device_configurations(&node.device_configurations, prefix),
        ..node.clone()
    })
}

/// Sharding specs name the node's tensors
fn rename_device_configurations(
    configs: &[NodeDeviceConfigurationProto],
    prefix: &str,
) -> Vec<NodeDeviceConfigurationProto> {
    let mut configs = configs.to_vec();
    for spec in configs.iter_mut().flat_map(|c| c.sharding_spec.iter_mut()) {
        spec.tensor_name = rename_reference(prefix, &spec.tensor_name);
    }
    configs
}

/// Renamed copies of every node of a sequence.
///
/// Unnamed nodes get `prefix_op<index>`; when that local name is already taken
/// by another node of the sequence a numeric suffix is appended, so the
/// renamed names stay unique whenever the source names are.
pub fn rename_nodes(nodes: &[NodeProto], prefix: &str) -> OnnxResult<Vec<NodeProto>> {
    let mut taken: FxHashSet<String> = nodes
        .iter()
        .filter(|n| !n.name.is_empty())
        .map(|n| n.name.clone())
        .collect();

    nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            if node.name.is_empty() {
                let local = synthesize_name(&mut taken, idx);
                rename_node_as(node, prefix, &local)
            } else {
                rename_node_as(node, prefix, &node.name)
            }
        })
        .collect()
}

fn synthesize_name(taken: &mut FxHashSet<String>, index: usize) -> String {
    let base = format!("op{}", index);
    let mut candidate = base.clone();
    let mut suffix = 0;
    while taken.contains(&candidate) {
        suffix += 1;
        candidate = format!("{}_{}", base, suffix);
    }
    taken.insert(candidate.clone());
    candidate
}

fn rename_attribute(attr: &AttributeProto, prefix: &str) -> OnnxResult<AttributeProto> {
    match attr.value()? {
        AttributeValue::Plain => Ok(attr.clone()),
        AttributeValue::Graph(graph) => Ok(AttributeProto {
            g: Some(rename_subgraph(graph, prefix)?),
            ..shell_of(attr)
        }),
        AttributeValue::Graphs(graphs) => Ok(AttributeProto {
            graphs: graphs
                .iter()
                .map(|g| rename_subgraph(g, prefix))
                .collect::<OnnxResult<Vec<_>>>()?,
            ..shell_of(attr)
        }),
    }
}

/// Attribute metadata without any graph payload
fn shell_of(attr: &AttributeProto) -> AttributeProto {
    AttributeProto {
        name: attr.name.clone(),
        ref_attr_name: attr.ref_attr_name.clone(),
        doc_string: attr.doc_string.clone(),
        r#type: attr.r#type,
        ..Default::default()
    }
}

/// Rewrite a nested body graph.
///
/// Derived `value_info` is dropped, nodes go through the renaming pass, and
/// the body's own initializers and declared inputs/outputs take the prefix.
pub fn rename_subgraph(graph: &GraphProto, prefix: &str) -> OnnxResult<GraphProto> {
    let mut body = GraphProto {
        node: rename_nodes(&graph.node, prefix)?,
        initializer: rename_initializers(&graph.initializer, prefix),
        sparse_initializer: rename_sparse_initializers(&graph.sparse_initializer, prefix),
        quantization_annotation: rename_annotations(&graph.quantization_annotation, prefix),
        value_info: Vec::new(),
        ..graph.clone()
    };
    rename_in_place(&mut body.input, prefix);
    rename_in_place(&mut body.output, prefix);
    Ok(body)
}

/// Nodes, constants and annotations of a graph renamed under one prefix.
///
/// Declared inputs and outputs are left to the caller, which decides which of
/// them become part of an external interface.
#[derive(Debug, Clone, Default)]
pub struct RenamedGraph {
    /// Renamed nodes in source order
    pub nodes: Vec<NodeProto>,
    /// Renamed initializers
    pub initializers: Vec<TensorProto>,
    /// Renamed sparse initializers
    pub sparse_initializers: Vec<SparseTensorProto>,
    /// Renamed intermediate value info
    pub value_info: Vec<ValueInfoProto>,
    /// Renamed quantization annotations
    pub quantization_annotation: Vec<TensorAnnotation>,
}

/// Rename the contents of a graph under `prefix`
pub fn rename_graph(graph: &GraphProto, prefix: &str) -> OnnxResult<RenamedGraph> {
    Ok(RenamedGraph {
        nodes: rename_nodes(&graph.node, prefix)?,
        initializers: rename_initializers(&graph.initializer, prefix),
        sparse_initializers: rename_sparse_initializers(&graph.sparse_initializer, prefix),
        value_info: rename_value_infos(&graph.value_info, prefix),
        quantization_annotation: rename_annotations(&graph.quantization_annotation, prefix),
    })
}

/// Rename every identifier of a graph, including its declared interface
pub fn rename_graph_full(graph: &GraphProto, prefix: &str) -> OnnxResult<GraphProto> {
    let renamed = rename_graph(graph, prefix)?;
    Ok(GraphProto {
        node: renamed.nodes,
        initializer: renamed.initializers,
        sparse_initializer: renamed.sparse_initializers,
        value_info: renamed.value_info,
        quantization_annotation: renamed.quantization_annotation,
        input: rename_value_infos(&graph.input, prefix),
        output: rename_value_infos(&graph.output, prefix),
        name: rename_reference(prefix, &graph.name),
        ..graph.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_float_tensor, make_graph, make_node, make_value_info};

    fn make_test_graph() -> GraphProto {
        make_graph(
            vec![
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                make_node("Clip", &["conv_out", "", "max"], &["Y"], ""),
            ],
            "test",
            vec![make_value_info("X")],
            vec![make_value_info("Y")],
            vec![
                make_float_tensor("W", &[1], vec![1.0]),
                make_float_tensor("max", &[], vec![6.0]),
            ],
            vec![make_value_info("conv_out")],
        )
    }

    #[test]
    fn test_merge_name() {
        assert_eq!(merge_name("g1", "x"), "g1_x");
    }

    #[test]
    fn test_empty_reference_stays_empty() {
        assert_eq!(rename_reference("g1", ""), "");
        assert_eq!(rename_reference("g1", "a"), "g1_a");
    }

    #[test]
    fn test_rename_node_names_and_tensors() {
        let graph = make_test_graph();
        let nodes = rename_nodes(&graph.node, "p").unwrap();

        assert_eq!(nodes[0].name, "p_conv_0");
        assert_eq!(nodes[0].input, vec!["p_X", "p_W"]);
        assert_eq!(nodes[0].output, vec!["p_conv_out"]);

        // empty name synthesized from position, optional slot untouched
        assert_eq!(nodes[1].name, "p_op1");
        assert_eq!(nodes[1].input, vec!["p_conv_out", "", "p_max"]);
    }

    #[test]
    fn test_rename_graph_leaves_source_untouched() {
        let graph = make_test_graph();
        let renamed = rename_graph(&graph, "g1").unwrap();

        assert_eq!(renamed.initializers[0].name, "g1_W");
        assert_eq!(renamed.initializers[0].float_data, vec![1.0]);
        assert_eq!(renamed.value_info[0].name, "g1_conv_out");
        assert_eq!(graph.initializer[0].name, "W");
        assert_eq!(graph.node[0].name, "conv_0");
    }

    #[test]
    fn test_rename_in_place() {
        let mut io = vec![make_value_info("X"), make_value_info("Y")];
        rename_in_place(&mut io, "g2");
        assert_eq!(io[0].name, "g2_X");
        assert_eq!(io[1].name, "g2_Y");
    }

    #[test]
    fn test_prefixes_compose() {
        let graph = make_test_graph();
        let once = rename_graph_full(&graph, "p1").unwrap();
        let twice = rename_graph_full(&once, "p2").unwrap();

        assert_eq!(twice.name, "p2_p1_test");
        assert_eq!(twice.node[0].name, "p2_p1_conv_0");
        assert_eq!(twice.node[1].input, vec!["p2_p1_conv_out", "", "p2_p1_max"]);
        assert_eq!(twice.input[0].name, "p2_p1_X");
        assert_eq!(twice.output[0].name, "p2_p1_Y");
    }

    #[test]
    fn test_distinct_prefixes_do_not_collide() {
        let graph = make_test_graph();
        let a = rename_graph_full(&graph, "g1").unwrap();
        let b = rename_graph_full(&graph, "g2").unwrap();

        for na in &a.node {
            assert!(b.node.iter().all(|nb| nb.name != na.name));
            for out in &na.output {
                assert!(b.node.iter().all(|nb| !nb.output.contains(out)));
            }
        }
    }

    #[test]
    fn test_synthesized_name_avoids_existing_names() {
        let nodes = vec![
            make_node("Relu", &["x"], &["a"], "op1"),
            make_node("Relu", &["a"], &["b"], ""),
            make_node("Relu", &["b"], &["y"], "op1_1"),
            make_node("Relu", &["y"], &["z"], ""),
        ];
        let renamed = rename_nodes(&nodes, "g1").unwrap();
        let names: Vec<_> = renamed.iter().map(|n| n.name.as_str()).collect();

        assert_eq!(names, vec!["g1_op1", "g1_op1_2", "g1_op1_1", "g1_op3"]);
    }

    #[test]
    fn test_rename_sparse_initializers_and_annotations() {
        let sparse = SparseTensorProto {
            values: Some(make_float_tensor("emb", &[2], vec![1.0, 2.0])),
            indices: Some(TensorProto::default()),
            dims: vec![4],
        };
        let annotation = TensorAnnotation {
            tensor_name: "y".to_string(),
            quant_parameter_tensor_names: vec![StringStringEntryProto {
                key: "SCALE_TENSOR".to_string(),
                value: "y_scale".to_string(),
            }],
        };
        let graph = GraphProto {
            sparse_initializer: vec![sparse],
            quantization_annotation: vec![annotation],
            ..Default::default()
        };

        let renamed = rename_graph(&graph, "g1").unwrap();
        let values = renamed.sparse_initializers[0].values.as_ref().unwrap();
        assert_eq!(values.name, "g1_emb");
        assert_eq!(renamed.sparse_initializers[0].indices.as_ref().unwrap().name, "");
        assert_eq!(renamed.sparse_initializers[0].dims, vec![4]);

        let annotation = &renamed.quantization_annotation[0];
        assert_eq!(annotation.tensor_name, "g1_y");
        assert_eq!(annotation.quant_parameter_tensor_names[0].key, "SCALE_TENSOR");
        assert_eq!(annotation.quant_parameter_tensor_names[0].value, "g1_y_scale");
    }

    #[test]
    fn test_rename_body_attribute() {
        let body = make_graph(
            vec![make_node("Add", &["i", "outer"], &["o"], "")],
            "body",
            vec![make_value_info("i")],
            vec![make_value_info("o")],
            vec![],
            vec![make_value_info("derived")],
        );
        let mut node = make_node("Loop", &["trip", "", "init"], &["final"], "loop");
        node.attribute.push(AttributeProto::new_graph("body", body));

        let renamed = rename_node(&node, "m", 0).unwrap();
        let g = renamed.attribute[0].g.as_ref().unwrap();

        assert_eq!(renamed.attribute[0].name, "body");
        assert_eq!(g.node[0].name, "m_op0");
        assert_eq!(g.node[0].input, vec!["m_i", "m_outer"]);
        assert_eq!(g.input[0].name, "m_i");
        assert_eq!(g.output[0].name, "m_o");
        assert!(g.value_info.is_empty());
    }
}
