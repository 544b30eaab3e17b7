//! Node containers for composing embedded models
//!
//! A [`Container`] collects ordinary ONNX nodes next to "model nodes" that
//! stand for a whole pre-trained model used as an opaque operator. Opset
//! requirements and local functions belong to the outermost container:
//! nested containers share the root's sets, since a model carries a single
//! `opset_import` list and a single function library.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::library::FunctionSet;
use crate::opset::OpsetSet;
use crate::proto::{
    FunctionProto, ModelProto, NodeProto, OperatorSetIdProto, SparseTensorProto,
    TensorAnnotation, TensorProto, ValueInfoProto,
};

/// Entry of a container
#[derive(Debug, Clone)]
pub enum ContainerNode {
    /// An ordinary operator invocation
    Onnx(NodeProto),
    /// An embedded model, inlined on unfold under its own name as prefix
    Model {
        /// Unique name, used as the rename prefix
        name: String,
        /// The embedded model
        model: ModelProto,
    },
}

impl ContainerNode {
    /// Node or model name
    pub fn name(&self) -> &str {
        match self {
            ContainerNode::Onnx(node) => &node.name,
            ContainerNode::Model { name, .. } => name,
        }
    }

    /// Whether this entry embeds a model
    pub fn is_model(&self) -> bool {
        matches!(self, ContainerNode::Model { .. })
    }
}

/// Ordered node list with pooled initializers and value info
#[derive(Debug)]
pub struct Container {
    /// Entries in insertion order
    pub nodes: Vec<ContainerNode>,
    /// Initializers accumulated while unfolding
    pub initializers: Vec<TensorProto>,
    /// Sparse initializers accumulated while unfolding
    pub sparse_initializers: Vec<SparseTensorProto>,
    /// Value info accumulated while unfolding
    pub value_info: Vec<ValueInfoProto>,
    /// Quantization annotations accumulated while unfolding
    pub quantization_annotation: Vec<TensorAnnotation>,
    opsets: Rc<RefCell<OpsetSet>>,
    functions: Rc<RefCell<FunctionSet>>,
    depth: usize,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Create a root container with its own opset set
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            initializers: Vec::new(),
            sparse_initializers: Vec::new(),
            value_info: Vec::new(),
            quantization_annotation: Vec::new(),
            opsets: Rc::new(RefCell::new(OpsetSet::new())),
            functions: Rc::new(RefCell::new(FunctionSet::new())),
            depth: 0,
        }
    }

    /// Create a child container that records opsets and functions on the root
    pub fn nested(&self) -> Self {
        Self {
            nodes: Vec::new(),
            initializers: Vec::new(),
            sparse_initializers: Vec::new(),
            value_info: Vec::new(),
            quantization_annotation: Vec::new(),
            opsets: Rc::clone(&self.opsets),
            functions: Rc::clone(&self.functions),
            depth: self.depth + 1,
        }
    }

    /// Whether this is the outermost container
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Nesting depth, 0 for the root
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append an ordinary node
    pub fn add_node(&mut self, node: NodeProto) -> &mut Self {
        self.nodes.push(ContainerNode::Onnx(node));
        self
    }

    /// Append an embedded model
    pub fn add_model(&mut self, name: &str, model: ModelProto) -> &mut Self {
        self.nodes.push(ContainerNode::Model {
            name: name.to_string(),
            model,
        });
        self
    }

    /// Append an initializer
    pub fn add_initializer(&mut self, tensor: TensorProto) -> &mut Self {
        self.initializers.push(tensor);
        self
    }

    /// Record an opset requirement on the root
    pub fn record_opset(&self, domain: &str, version: i64) {
        self.opsets.borrow_mut().insert(domain, version);
    }

    /// Opset requirements recorded on the root
    pub fn opsets(&self) -> Ref<'_, OpsetSet> {
        self.opsets.borrow()
    }

    /// Root opset requirements as model imports
    pub fn opset_imports(&self) -> Vec<OperatorSetIdProto> {
        self.opsets.borrow().to_opset_imports()
    }

    /// Record the local functions of an embedded model on the root
    pub fn record_functions(&self, model: &ModelProto) {
        self.functions.borrow_mut().extend_from_model(model);
    }

    /// Local functions recorded on the root
    pub fn functions(&self) -> Vec<FunctionProto> {
        self.functions.borrow().to_functions()
    }
}
