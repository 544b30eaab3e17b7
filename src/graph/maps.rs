//! Producer index types and builders
//!
//! Defines the lookup tables the dependency analysis is built on. The tables
//! are owned by the traversal that builds them, never by the graph.

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{OnnxResult, TransformError};
use crate::proto::extensions::AttributeValue;
use crate::proto::{GraphProto, NodeProto, SparseTensorProto, TensorProto, ValueInfoProto};

/// Position of a node in the slice a [`ProducerIndex`] was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Raw index into the node slice
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tensors available before any node runs
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphScope<'a> {
    /// Declared graph inputs
    pub inputs: &'a [ValueInfoProto],
    /// Dense initializers
    pub initializers: &'a [TensorProto],
    /// Sparse initializers, named by their `values` tensor
    pub sparse_initializers: &'a [SparseTensorProto],
}

impl<'a> GraphScope<'a> {
    /// Scope of a graph
    pub fn of(graph: &'a GraphProto) -> Self {
        Self {
            inputs: &graph.input,
            initializers: &graph.initializer,
            sparse_initializers: &graph.sparse_initializer,
        }
    }

    /// Non-empty names of every tensor in scope
    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        let sparse = self
            .sparse_initializers
            .iter()
            .filter_map(|s| s.values.as_ref())
            .map(|t| t.name.as_str());

        self.inputs
            .iter()
            .map(|vi| vi.name.as_str())
            .chain(self.initializers.iter().map(|t| t.name.as_str()))
            .chain(sparse)
            .filter(|name| !name.is_empty())
    }
}

/// What produces a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    /// A declared graph input or an initializer, dense or sparse
    GraphInput,
    /// The output of a node
    Node(NodeId),
}

/// Maps each tensor name to its single producer
#[derive(Debug, Default)]
pub struct ProducerIndex<'a> {
    map: FxHashMap<&'a str, Producer>,
}

impl<'a> ProducerIndex<'a> {
    /// Index the scope's tensors and node outputs.
    ///
    /// A tensor produced by two nodes, or by a node and a graph input, breaks
    /// the single-producer invariant and is rejected.
    pub fn build(nodes: &'a [NodeProto], scope: GraphScope<'a>) -> OnnxResult<Self> {
        let mut map = FxHashMap::default();

        for name in scope.names() {
            map.insert(name, Producer::GraphInput);
        }

        for (idx, node) in nodes.iter().enumerate() {
            for output in node.output.iter().filter(|o| !o.is_empty()) {
                if map.insert(output.as_str(), Producer::Node(NodeId(idx))).is_some() {
                    return Err(TransformError::NamingContractViolation(format!(
                        "tensor '{}' has more than one producer (last: {})",
                        output,
                        display_name(node, idx)
                    )));
                }
            }
        }

        Ok(Self { map })
    }

    /// Producer of a tensor
    pub fn get(&self, tensor: &str) -> Option<Producer> {
        self.map.get(tensor).copied()
    }

    /// Check if a tensor has a producer
    pub fn contains(&self, tensor: &str) -> bool {
        self.map.contains_key(tensor)
    }

    /// Number of indexed tensors
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Node name for diagnostics, falling back to op type and position
pub fn display_name(node: &NodeProto, idx: usize) -> String {
    if node.name.is_empty() {
        format!("{}#{}", node.op_type, idx)
    } else {
        node.name.clone()
    }
}

/// Outer-scope tensors referenced from inside a node's nested graphs.
///
/// These are implicit inputs of the node: whatever produces them must be
/// ordered before it.
pub fn subgraph_references(node: &NodeProto) -> OnnxResult<Vec<String>> {
    let mut refs = IndexSet::new();
    collect_node_references(node, &mut refs)?;
    Ok(refs.into_iter().collect())
}

fn collect_node_references(node: &NodeProto, refs: &mut IndexSet<String>) -> OnnxResult<()> {
    for attr in &node.attribute {
        match attr.value()? {
            AttributeValue::Plain => {}
            AttributeValue::Graph(graph) => collect_graph_references(graph, refs)?,
            AttributeValue::Graphs(graphs) => {
                for graph in graphs {
                    collect_graph_references(graph, refs)?;
                }
            }
        }
    }
    Ok(())
}

fn collect_graph_references(graph: &GraphProto, refs: &mut IndexSet<String>) -> OnnxResult<()> {
    let local: FxHashSet<&str> = GraphScope::of(graph)
        .names()
        .chain(graph.node.iter().flat_map(|n| n.output.iter().map(String::as_str)))
        .collect();

    for node in &graph.node {
        for name in node.bound_inputs() {
            if !local.contains(name) {
                refs.insert(name.to_string());
            }
        }

        let mut nested = IndexSet::new();
        collect_node_references(node, &mut nested)?;
        refs.extend(nested.into_iter().filter(|name| !local.contains(name.as_str())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_float_tensor, make_graph, make_node, make_value_info};
    use crate::proto::AttributeProto;

    fn make_test_graph() -> GraphProto {
        make_graph(
            vec![
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
            ],
            "test",
            vec![make_value_info("X")],
            vec![make_value_info("Y")],
            vec![make_float_tensor("W", &[1], vec![0.5])],
            vec![],
        )
    }

    #[test]
    fn test_build_producer_index() {
        let graph = make_test_graph();
        let index = ProducerIndex::build(&graph.node, GraphScope::of(&graph)).unwrap();

        assert_eq!(index.get("X"), Some(Producer::GraphInput));
        assert_eq!(index.get("W"), Some(Producer::GraphInput));
        assert_eq!(index.get("conv_out"), Some(Producer::Node(NodeId(0))));
        assert_eq!(index.get("Y"), Some(Producer::Node(NodeId(1))));
        assert!(!index.contains("missing"));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_duplicate_producer_rejected() {
        let nodes = vec![
            make_node("Relu", &["X"], &["Y"], "a"),
            make_node("Sigmoid", &["X"], &["Y"], "b"),
        ];
        let inputs = vec![make_value_info("X")];
        let scope = GraphScope {
            inputs: &inputs,
            ..Default::default()
        };
        let err = ProducerIndex::build(&nodes, scope).unwrap_err();
        assert!(matches!(err, TransformError::NamingContractViolation(_)));
    }

    #[test]
    fn test_sparse_initializer_is_in_scope() {
        let mut graph = make_test_graph();
        graph.sparse_initializer.push(SparseTensorProto {
            values: Some(make_float_tensor("emb", &[1], vec![1.0])),
            ..Default::default()
        });

        let index = ProducerIndex::build(&graph.node, GraphScope::of(&graph)).unwrap();
        assert_eq!(index.get("emb"), Some(Producer::GraphInput));

        let names: Vec<_> = GraphScope::of(&graph).names().collect();
        assert_eq!(names, vec!["X", "W", "emb"]);
    }

    #[test]
    fn test_subgraph_references() {
        let inner = make_graph(
            vec![make_node("Mul", &["j", "scale"], &["k"], "mul")],
            "inner",
            vec![make_value_info("j")],
            vec![make_value_info("k")],
            vec![],
            vec![],
        );
        let mut nested = make_node("If", &["cond"], &["k_out"], "if");
        nested
            .attribute
            .push(AttributeProto::new_graph("then_branch", inner));

        let body = make_graph(
            vec![
                make_node("Add", &["i", "bias"], &["j"], "add"),
                nested,
            ],
            "body",
            vec![make_value_info("i")],
            vec![make_value_info("k_out")],
            vec![],
            vec![],
        );
        let mut loop_node = make_node("Loop", &["n", ""], &["out"], "loop");
        loop_node
            .attribute
            .push(AttributeProto::new_graph("body", body));

        let refs = subgraph_references(&loop_node).unwrap();
        assert_eq!(refs, vec!["bias", "cond", "scale"]);
    }

    #[test]
    fn test_display_name_fallback() {
        let node = make_node("Relu", &[], &[], "");
        assert_eq!(display_name(&node, 3), "Relu#3");
    }
}
