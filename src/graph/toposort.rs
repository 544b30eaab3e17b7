//! Dependency graph and topological ordering
//!
//! Nodes are ordered so that every node comes after the producers of all of
//! its inputs. Graph inputs and initializers share a synthetic placeholder
//! vertex; `Constant` nodes have no data dependencies and are traversal roots
//! right after it.
//!
//! The traversal is a depth-first post-order. Re-entering a node that is
//! still in progress means the graph is not a DAG.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::error::{OnnxResult, TransformError};
use crate::proto::{GraphProto, NodeProto, TensorProto, ValueInfoProto};

use super::maps::{
    display_name, subgraph_references, GraphScope, NodeId, Producer, ProducerIndex,
};

/// Successor list, optimized for the common case of a few consumers
pub type Successors = SmallVec<[NodeId; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Visited,
}

/// Producer → consumer edges over a node slice
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    nodes: &'a [NodeProto],
    input_successors: Successors,
    successors: Vec<Successors>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the edges of a node list.
    ///
    /// Every non-empty input, explicit or referenced from inside a nested
    /// graph, must resolve to a producer. Declared graph outputs must resolve
    /// too.
    pub fn build(
        nodes: &'a [NodeProto],
        inputs: &'a [ValueInfoProto],
        initializers: &'a [TensorProto],
        outputs: &[ValueInfoProto],
    ) -> OnnxResult<Self> {
        let scope = GraphScope {
            inputs,
            initializers,
            sparse_initializers: &[],
        };
        Self::scoped(nodes, scope, outputs)
    }

    /// Build the edges of a node list against an explicit scope
    pub fn scoped(
        nodes: &'a [NodeProto],
        scope: GraphScope<'a>,
        outputs: &[ValueInfoProto],
    ) -> OnnxResult<Self> {
        let index = ProducerIndex::build(nodes, scope)?;

        let mut input_successors = Successors::new();
        let mut successors = vec![Successors::new(); nodes.len()];

        for (idx, node) in nodes.iter().enumerate() {
            let consumer = NodeId(idx);
            let implicit = subgraph_references(node)?;

            for tensor in node
                .bound_inputs()
                .chain(implicit.iter().map(String::as_str))
            {
                match index.get(tensor) {
                    Some(Producer::GraphInput) => input_successors.push(consumer),
                    Some(Producer::Node(producer)) => successors[producer.0].push(consumer),
                    None => {
                        return Err(TransformError::DanglingReference {
                            node: display_name(node, idx),
                            tensor: tensor.to_string(),
                        })
                    }
                }
            }
        }

        for output in outputs.iter().filter(|vi| !vi.name.is_empty()) {
            if !index.contains(&output.name) {
                return Err(TransformError::DanglingReference {
                    node: "<graph output>".to_string(),
                    tensor: output.name.clone(),
                });
            }
        }

        Ok(Self {
            nodes,
            input_successors,
            successors,
        })
    }

    /// Build from a graph
    pub fn from_graph(graph: &'a GraphProto) -> OnnxResult<Self> {
        Self::scoped(&graph.node, GraphScope::of(graph), &graph.output)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at an id
    pub fn node(&self, id: NodeId) -> &'a NodeProto {
        &self.nodes[id.0]
    }

    /// Consumers of a node's outputs
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id.0]
    }

    /// Consumers of graph inputs and initializers
    pub fn input_successors(&self) -> &[NodeId] {
        &self.input_successors
    }

    /// All node → node edges
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.successors
            .iter()
            .enumerate()
            .flat_map(|(idx, succ)| succ.iter().map(move |&s| (NodeId(idx), s)))
    }

    /// Every node must carry a non-empty name no other node uses
    fn check_names(&self) -> OnnxResult<()> {
        let mut seen = FxHashSet::default();
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.name.is_empty() {
                return Err(TransformError::NamingContractViolation(format!(
                    "topological sort depends on unique node names, {} has none",
                    display_name(node, idx)
                )));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(TransformError::NamingContractViolation(format!(
                    "node name '{}' is used more than once",
                    node.name
                )));
            }
        }
        Ok(())
    }

    /// Vertex successors; the placeholder is vertex `len()`
    fn vertex_successors(&self, vertex: usize) -> &[NodeId] {
        if vertex == self.nodes.len() {
            &self.input_successors
        } else {
            &self.successors[vertex]
        }
    }

    /// Node ids in topological order.
    ///
    /// Roots are the placeholder, then `Constant` nodes, then any node not yet
    /// reached, so unreachable nodes and isolated cycles are never dropped.
    pub fn order(&self) -> OnnxResult<Vec<NodeId>> {
        self.check_names()?;

        let placeholder = self.nodes.len();
        let mut marks = vec![Mark::Unvisited; placeholder + 1];
        let mut order = Vec::with_capacity(placeholder);

        let constants = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_op_type("Constant"))
            .map(|(idx, _)| idx);
        let roots = std::iter::once(placeholder)
            .chain(constants)
            .chain(0..placeholder);

        for root in roots {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (vertex, cursor) = *frame;
                let succ = self.vertex_successors(vertex);

                if cursor < succ.len() {
                    frame.1 += 1;
                    let next = succ[cursor].0;
                    match marks[next] {
                        Mark::Visited => {}
                        Mark::InProgress => {
                            return Err(TransformError::CycleDetected {
                                node: self.nodes[next].name.clone(),
                            })
                        }
                        Mark::Unvisited => {
                            marks[next] = Mark::InProgress;
                            stack.push((next, 0));
                        }
                    }
                } else {
                    stack.pop();
                    marks[vertex] = Mark::Visited;
                    if vertex != placeholder {
                        order.push(NodeId(vertex));
                    }
                }
            }
        }

        order.reverse();
        Ok(order)
    }
}

/// Nodes reordered so producers precede consumers
pub fn topological_sort(
    nodes: &[NodeProto],
    inputs: &[ValueInfoProto],
    initializers: &[TensorProto],
    outputs: &[ValueInfoProto],
) -> OnnxResult<Vec<NodeProto>> {
    let deps = DependencyGraph::build(nodes, inputs, initializers, outputs)?;
    let order = deps.order()?;
    log::trace!("topologically sorted {} nodes", order.len());
    Ok(order.into_iter().map(|id| nodes[id.0].clone()).collect())
}

/// Copy of a graph with its nodes topologically sorted
pub fn sort_graph(graph: &GraphProto) -> OnnxResult<GraphProto> {
    Ok(GraphProto {
        node: sorted_nodes(graph)?,
        ..graph.clone()
    })
}

/// Nodes of a graph in topological order
pub fn sorted_nodes(graph: &GraphProto) -> OnnxResult<Vec<NodeProto>> {
    let deps = DependencyGraph::from_graph(graph)?;
    let order = deps.order()?;
    Ok(order.into_iter().map(|id| deps.node(id).clone()).collect())
}

/// Check that producers precede consumers in the given order.
///
/// Outer-scope tensors read from nested bodies count as inputs of the node
/// that owns the body, as they do for [`DependencyGraph`].
pub fn is_topologically_sorted(graph: &GraphProto) -> bool {
    let mut available: FxHashSet<&str> = GraphScope::of(graph).names().collect();

    for node in &graph.node {
        if !node.bound_inputs().all(|name| available.contains(name)) {
            return false;
        }
        match subgraph_references(node) {
            Ok(implicit) if implicit.iter().all(|name| available.contains(name.as_str())) => {}
            _ => return false,
        }
        available.extend(node.output.iter().map(String::as_str));
    }
    true
}
