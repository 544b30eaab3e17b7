//! Extension methods for ONNX protobuf types
//!
//! Provides convenient helper methods and constructors for working with ONNX
//! protobuf types.

use super::onnx::*;
use crate::error::{OnnxResult, TransformError};

// ============================================================================
// ModelProto extensions
// ============================================================================

impl ModelProto {
    /// Borrow the graph, failing if the model carries none
    pub fn require_graph(&self) -> OnnxResult<&GraphProto> {
        self.graph
            .as_ref()
            .ok_or_else(|| TransformError::MissingField("model.graph".to_string()))
    }
}

// ============================================================================
// NodeProto extensions
// ============================================================================

impl NodeProto {
    /// Get attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeProto> {
        self.attribute.iter().find(|attr| attr.name == name)
    }

    /// Check if this node has a specific op type
    pub fn is_op_type(&self, op_type: &str) -> bool {
        self.op_type == op_type
    }

    /// Check if any attribute of this node embeds a graph
    pub fn has_subgraphs(&self) -> bool {
        self.attribute
            .iter()
            .any(|attr| attr.g.is_some() || !attr.graphs.is_empty())
    }

    /// Iterate over the non-empty input names
    pub fn bound_inputs(&self) -> impl Iterator<Item = &str> {
        self.input
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

// ============================================================================
// AttributeProto extensions
// ============================================================================

/// Payload view of an attribute.
///
/// Graph-valued attributes (loop and branch bodies) are the only place where
/// graphs nest; everything else is a plain value the composer copies verbatim.
#[derive(Debug, Clone, Copy)]
pub enum AttributeValue<'a> {
    /// A single nested graph (`g`)
    Graph(&'a GraphProto),
    /// A list of nested graphs (`graphs`)
    Graphs(&'a [GraphProto]),
    /// Any scalar, string, tensor or list payload
    Plain,
}

impl AttributeValue<'_> {
    /// Whether the attribute embeds at least one graph
    pub fn is_graph(&self) -> bool {
        !matches!(self, AttributeValue::Plain)
    }
}

impl AttributeProto {
    /// Declared attribute type, `Undefined` for unknown values
    pub fn attribute_type(&self) -> attribute_proto::AttributeType {
        attribute_proto::AttributeType::try_from(self.r#type)
            .unwrap_or(attribute_proto::AttributeType::Undefined)
    }

    /// Classify the attribute payload.
    ///
    /// An attribute declared as `GRAPH` without a graph payload is malformed.
    /// Untyped attributes fall back to whichever graph field is populated.
    pub fn value(&self) -> OnnxResult<AttributeValue<'_>> {
        use attribute_proto::AttributeType;

        match self.attribute_type() {
            AttributeType::Graph => self.g.as_ref().map(AttributeValue::Graph).ok_or_else(|| {
                TransformError::InvalidNode(format!(
                    "attribute '{}' is declared as a graph but carries none",
                    self.name
                ))
            }),
            AttributeType::Graphs => Ok(AttributeValue::Graphs(&self.graphs)),
            AttributeType::Undefined => match (&self.g, self.graphs.is_empty()) {
                (Some(g), _) => Ok(AttributeValue::Graph(g)),
                (None, false) => Ok(AttributeValue::Graphs(&self.graphs)),
                (None, true) => Ok(AttributeValue::Plain),
            },
            _ => Ok(AttributeValue::Plain),
        }
    }

    /// Create a new integer attribute
    pub fn new_int(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            i: value,
            r#type: attribute_proto::AttributeType::Int as i32,
            ..Default::default()
        }
    }

    /// Create a new graph attribute
    pub fn new_graph(name: &str, value: GraphProto) -> Self {
        Self {
            name: name.to_string(),
            g: Some(value),
            r#type: attribute_proto::AttributeType::Graph as i32,
            ..Default::default()
        }
    }

    /// Create a new graph-list attribute
    pub fn new_graphs(name: &str, values: Vec<GraphProto>) -> Self {
        Self {
            name: name.to_string(),
            graphs: values,
            r#type: attribute_proto::AttributeType::Graphs as i32,
            ..Default::default()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Create a new ValueInfoProto for a tensor
pub fn make_tensor_value_info(name: &str, elem_type: i32, shape: &[i64]) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type,
                shape: Some(TensorShapeProto {
                    dim: shape
                        .iter()
                        .map(|&d| tensor_shape_proto::Dimension {
                            value: Some(tensor_shape_proto::dimension::Value::DimValue(d)),
                            denotation: String::new(),
                        })
                        .collect(),
                }),
            })),
            denotation: String::new(),
        }),
        doc_string: String::new(),
        metadata_props: Vec::new(),
    }
}

/// Create an untyped ValueInfoProto carrying only a name
pub fn make_value_info(name: &str) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create a float initializer
pub fn make_float_tensor(name: &str, dims: &[i64], values: Vec<f32>) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: dims.to_vec(),
        data_type: tensor_proto::DataType::Float as i32,
        float_data: values,
        ..Default::default()
    }
}

/// Create a new NodeProto
pub fn make_node(op_type: &str, inputs: &[&str], outputs: &[&str], name: &str) -> NodeProto {
    NodeProto {
        op_type: op_type.to_string(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create a new GraphProto
pub fn make_graph(
    nodes: Vec<NodeProto>,
    name: &str,
    inputs: Vec<ValueInfoProto>,
    outputs: Vec<ValueInfoProto>,
    initializers: Vec<TensorProto>,
    value_info: Vec<ValueInfoProto>,
) -> GraphProto {
    GraphProto {
        node: nodes,
        name: name.to_string(),
        initializer: initializers,
        input: inputs,
        output: outputs,
        value_info,
        ..Default::default()
    }
}

/// Create an opset import entry
pub fn make_opsetid(domain: &str, version: i64) -> OperatorSetIdProto {
    OperatorSetIdProto {
        domain: domain.to_string(),
        version,
    }
}

/// Wrap a graph into a ModelProto with the given opset imports
pub fn make_model(graph: GraphProto, opset_imports: Vec<OperatorSetIdProto>) -> ModelProto {
    ModelProto {
        ir_version: crate::IR_VERSION,
        opset_import: opset_imports,
        graph: Some(graph),
        ..Default::default()
    }
}
