//! Port wiring between composed graphs
//!
//! A port mapping associates a consumer tensor name (a prefixed declared input
//! of some graph) with the producer tensor that feeds it. Entries supplied by
//! the caller win; every input they leave open is wired positionally to the
//! same-index output of the preceding graph.

use indexmap::IndexMap;

use crate::builder::cleanup::collect_node_inputs;
use crate::error::{OnnxResult, TransformError};
use crate::proto::{GraphProto, NodeProto};
use crate::rename::merge_name;

/// Consumer tensor name → producer tensor name, in insertion order
pub type PortMapping = IndexMap<String, String>;

/// Prefixed declared interface of one graph in a join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPort {
    /// Prefixed declared input names
    pub inputs: Vec<String>,
    /// Prefixed declared output names
    pub outputs: Vec<String>,
}

impl ModelPort {
    /// Build the port of a graph renamed under `prefix`
    pub fn of(graph: &GraphProto, prefix: &str) -> Self {
        Self {
            inputs: graph
                .input
                .iter()
                .map(|vi| merge_name(prefix, &vi.name))
                .collect(),
            outputs: graph
                .output
                .iter()
                .map(|vi| merge_name(prefix, &vi.name))
                .collect(),
        }
    }
}

/// Ports of every graph, paired with its prefix
pub fn model_ports(graphs: &[&GraphProto], prefixes: &[String]) -> Vec<ModelPort> {
    graphs
        .iter()
        .zip(prefixes)
        .map(|(graph, prefix)| ModelPort::of(graph, prefix))
        .collect()
}

/// Wire every unmapped input of graph `i + 1` to output `k` of graph `i`.
///
/// An input at index `k` with no output `k` in the preceding graph is an
/// [`TransformError::ArityMismatch`].
pub fn wire_adjacent(ports: &[ModelPort], mapping: &mut PortMapping) -> OnnxResult<()> {
    for (idx, pair) in ports.windows(2).enumerate() {
        let (producer, consumer) = (&pair[0], &pair[1]);

        for (input_index, input) in consumer.inputs.iter().enumerate() {
            if let Some(source) = mapping.get(input) {
                log::trace!("{} keeps explicit mapping to {}", input, source);
                continue;
            }

            let output = producer.outputs.get(input_index).ok_or(
                TransformError::ArityMismatch {
                    graph: idx + 1,
                    input_index,
                    available: producer.outputs.len(),
                },
            )?;
            log::trace!("{} wired to {}", input, output);
            mapping.insert(input.clone(), output.clone());
        }
    }
    Ok(())
}

/// Replace mapped input references, including those of nested graph nodes
pub fn remap_inputs(nodes: Vec<NodeProto>, mapping: &PortMapping) -> Vec<NodeProto> {
    nodes
        .into_iter()
        .map(|node| remap_node(node, mapping))
        .collect()
}

fn remap_node(mut node: NodeProto, mapping: &PortMapping) -> NodeProto {
    for input in node.input.iter_mut() {
        if let Some(source) = mapping.get(input.as_str()) {
            *input = source.clone();
        }
    }

    for attr in node.attribute.iter_mut() {
        if let Some(g) = attr.g.take() {
            attr.g = Some(remap_graph(g, mapping));
        }
        let graphs = std::mem::take(&mut attr.graphs);
        attr.graphs = graphs.into_iter().map(|g| remap_graph(g, mapping)).collect();
    }
    node
}

fn remap_graph(graph: GraphProto, mapping: &PortMapping) -> GraphProto {
    GraphProto {
        node: remap_inputs(graph.node, mapping),
        ..graph
    }
}

/// Mapping keys that no node reads
pub fn unused_mapping_keys<'m>(nodes: &[NodeProto], mapping: &'m PortMapping) -> Vec<&'m str> {
    let used = collect_node_inputs(nodes);
    mapping
        .keys()
        .map(String::as_str)
        .filter(|key| !used.contains(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_graph, make_node, make_value_info};
    use crate::proto::AttributeProto;

    fn port(inputs: &[&str], outputs: &[&str]) -> ModelPort {
        ModelPort {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_model_port_prefixes_interface() {
        let graph = make_graph(
            vec![],
            "g",
            vec![make_value_info("x")],
            vec![make_value_info("y"), make_value_info("z")],
            vec![],
            vec![],
        );

        assert_eq!(ModelPort::of(&graph, "g2"), port(&["g2_x"], &["g2_y", "g2_z"]));
    }

    #[test]
    fn test_wire_adjacent_positional() {
        let ports = vec![
            port(&["g1_x"], &["g1_a", "g1_b"]),
            port(&["g2_p", "g2_q"], &["g2_out"]),
        ];
        let mut mapping = PortMapping::new();

        wire_adjacent(&ports, &mut mapping).unwrap();

        assert_eq!(mapping.get("g2_p").map(String::as_str), Some("g1_a"));
        assert_eq!(mapping.get("g2_q").map(String::as_str), Some("g1_b"));
        assert!(!mapping.contains_key("g1_x"));
    }

    #[test]
    fn test_explicit_mapping_takes_precedence() {
        let ports = vec![
            port(&["g1_x"], &["g1_a"]),
            port(&["g2_p", "g2_q"], &["g2_out"]),
        ];
        let mut mapping = PortMapping::new();
        mapping.insert("g2_q".to_string(), "g1_x".to_string());

        wire_adjacent(&ports, &mut mapping).unwrap();

        assert_eq!(mapping.get("g2_p").map(String::as_str), Some("g1_a"));
        assert_eq!(mapping.get("g2_q").map(String::as_str), Some("g1_x"));
    }

    #[test]
    fn test_arity_mismatch() {
        let ports = vec![port(&["g1_x"], &["g1_a"]), port(&["g2_p", "g2_q"], &[])];
        let mut mapping = PortMapping::new();

        match wire_adjacent(&ports, &mut mapping) {
            Err(TransformError::ArityMismatch {
                graph,
                input_index,
                available,
            }) => {
                assert_eq!((graph, input_index, available), (1, 1, 1));
            }
            other => panic!("expected arity mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_remap_inputs_reaches_subgraphs() {
        let body = make_graph(
            vec![make_node("Add", &["g2_i", "g2_x"], &["g2_o"], "g2_add")],
            "body",
            vec![make_value_info("g2_i")],
            vec![make_value_info("g2_o")],
            vec![],
            vec![],
        );
        let mut loop_node = make_node("Loop", &["g2_n", "", "g2_x"], &["g2_y"], "g2_loop");
        loop_node
            .attribute
            .push(AttributeProto::new_graph("body", body));

        let mut mapping = PortMapping::new();
        mapping.insert("g2_x".to_string(), "g1_y".to_string());

        let nodes = remap_inputs(vec![loop_node], &mapping);

        assert_eq!(nodes[0].input, vec!["g2_n", "", "g1_y"]);
        let body = nodes[0].attribute[0].g.as_ref().unwrap();
        assert_eq!(body.node[0].input, vec!["g2_i", "g1_y"]);
    }

    #[test]
    fn test_unused_mapping_keys() {
        let nodes = vec![make_node("Relu", &["g2_x"], &["g2_y"], "g2_relu")];
        let mut mapping = PortMapping::new();
        mapping.insert("g2_x".to_string(), "g1_y".to_string());
        mapping.insert("g2_unused".to_string(), "g1_z".to_string());

        assert_eq!(unused_mapping_keys(&nodes, &mapping), vec!["g2_unused"]);
    }
}
