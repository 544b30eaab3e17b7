//! End-to-end composition tests

use std::collections::HashSet;

use onnx_compose::graph::is_topologically_sorted;
use onnx_compose::io::{load_model_from_bytes, model_to_bytes};
use onnx_compose::opset::get_opset_version;
use onnx_compose::prelude::*;
use onnx_compose::proto::extensions::{
    make_float_tensor, make_graph, make_model, make_node, make_opsetid, make_value_info,
};
use onnx_compose::unfold::build_model;

/// `y = Add(x, bias)` with a constant bias and a dead weight
fn affine_model(name: &str) -> ModelProto {
    let graph = make_graph(
        vec![make_node("Add", &["x", "bias"], &["y"], "add")],
        name,
        vec![make_value_info("x")],
        vec![make_value_info("y")],
        vec![
            make_float_tensor("bias", &[1], vec![1.0]),
            make_float_tensor("dead", &[1], vec![0.0]),
        ],
        vec![],
    );
    make_model(graph, vec![make_opsetid("", 13)])
}

/// `y = Loop(n, , x)` whose body reads the outer `x`
fn loop_model() -> ModelProto {
    let body = make_graph(
        vec![make_node("Add", &["iter_in", "x"], &["iter_out"], "")],
        "body",
        vec![make_value_info("iter_in")],
        vec![make_value_info("iter_out")],
        vec![],
        vec![],
    );
    let mut node = make_node("Loop", &["n", "", "x"], &["y"], "loop");
    node.attribute.push(AttributeProto::new_graph("body", body));

    let graph = make_graph(
        vec![node],
        "looped",
        vec![make_value_info("x"), make_value_info("n")],
        vec![make_value_info("y")],
        vec![],
        vec![],
    );
    make_model(graph, vec![make_opsetid("", 16)])
}

fn node_inputs<'g>(graph: &'g GraphProto, name: &str) -> Vec<&'g str> {
    graph
        .node
        .iter()
        .find(|n| n.name == name)
        .map(|n| n.input.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn test_pipeline_survives_serialization() {
    let joined = join_models(&[affine_model("a"), affine_model("b"), affine_model("c")]).unwrap();
    let restored = load_model_from_bytes(&model_to_bytes(&joined)).unwrap();
    assert_eq!(restored, joined);

    let graph = restored.graph.unwrap();
    assert_eq!(graph.name, "a_b_c");
    assert_eq!(graph.input[0].name, "g1_x");
    assert_eq!(graph.output[0].name, "g3_y");
    assert_eq!(node_inputs(&graph, "g2_add"), vec!["g1_y", "g2_bias"]);
    assert_eq!(node_inputs(&graph, "g3_add"), vec!["g2_y", "g3_bias"]);

    let inits: HashSet<_> = graph.initializer.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(inits, HashSet::from(["g1_bias", "g2_bias", "g3_bias"]));
    assert!(is_topologically_sorted(&graph));
}

#[test]
fn test_outer_scope_references_follow_wiring() {
    let joined = join_models_with(&[affine_model("a"), loop_model()], |ports| {
        let mut mapping = PortMapping::new();
        mapping.insert(ports[1].inputs[1].clone(), ports[0].inputs[0].clone());
        mapping
    })
    .unwrap();

    let graph = joined.graph.unwrap();
    assert_eq!(node_inputs(&graph, "g2_loop"), vec!["g1_x", "", "g1_y"]);

    let body = graph
        .node
        .iter()
        .find(|n| n.name == "g2_loop")
        .and_then(|n| n.attribute[0].g.as_ref())
        .unwrap();
    assert_eq!(body.node[0].name, "g2_op0");
    assert_eq!(body.node[0].input, vec!["g2_iter_in", "g1_y"]);

    let opsets: Vec<_> = joined.opset_import.iter().map(|o| o.version).collect();
    assert_eq!(opsets, vec![13]);
}

#[test]
fn test_cycle_through_mapping_is_reported() {
    let result = join_models_with(&[affine_model("a"), affine_model("b")], |ports| {
        let mut mapping = PortMapping::new();
        mapping.insert(ports[1].inputs[0].clone(), ports[1].outputs[0].clone());
        mapping
    });

    assert!(matches!(result, Err(TransformError::CycleDetected { .. })));
}

#[test]
fn test_container_with_embedded_pipeline() {
    let pipeline = join_models(&[affine_model("a"), affine_model("b")]).unwrap();

    let mut container = Container::new();
    container
        .add_node(make_node("Identity", &["pipe_g2_y"], &["out"], "tail"))
        .add_node(make_node("Identity", &["in"], &["pipe_g1_x"], "head"))
        .add_model("pipe", pipeline);

    let model = build_model(
        &mut container,
        "wrapped",
        vec![make_value_info("in")],
        vec![make_value_info("out")],
    )
    .unwrap();

    let graph = model.graph.as_ref().unwrap();
    let names: Vec<_> = graph.node.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["head", "pipe_g1_add", "pipe_g2_add", "tail"]);
    assert_eq!(graph.initializer.len(), 2);
    assert_eq!(get_opset_version(&model), Some(13));
}

#[test]
fn test_join_keeps_external_data_and_metadata() {
    let mut first = affine_model("a");
    first.metadata_props.push(StringStringEntryProto {
        key: "author".to_string(),
        value: "x".to_string(),
    });
    if let Some(graph) = first.graph.as_mut() {
        let bias = &mut graph.initializer[0];
        bias.float_data.clear();
        bias.data_location = tensor_proto::DataLocation::External as i32;
        bias.external_data.push(StringStringEntryProto {
            key: "location".to_string(),
            value: "bias.bin".to_string(),
        });
    }

    let joined = join_models(&[first, affine_model("b")]).unwrap();
    let restored = load_model_from_bytes(&model_to_bytes(&joined)).unwrap();
    assert_eq!(restored, joined);

    assert_eq!(restored.metadata_props[0].key, "author");
    let graph = restored.graph.unwrap();
    let bias = graph.initializer.iter().find(|t| t.name == "g1_bias").unwrap();
    assert_eq!(bias.external_data[0].value, "bias.bin");
    assert_eq!(
        bias.data_location,
        tensor_proto::DataLocation::External as i32
    );
}
