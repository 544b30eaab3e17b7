//! Model composition
//!
//! Joins N models into one. Each graph is renamed under a positional prefix
//! (`g1`, `g2`, ...); the first graph's inputs and the last graph's outputs
//! become the composed interface; the remaining inputs are wired to
//! producers, either by a caller-supplied port-mapping function or
//! positionally to the preceding graph's outputs.
//!
//! # Example
//!
//! ```ignore
//! use onnx_compose::compose::{join_models, ModelJoiner, PortMapping};
//!
//! // Linear pipeline: outputs of model i feed inputs of model i + 1
//! let pipeline = join_models(&[pre, net, post])?;
//!
//! // Skip connection: graph 3 reads graph 1 directly
//! let model = ModelJoiner::new()
//!     .io_mapping(|ports| {
//!         let mut mapping = PortMapping::new();
//!         mapping.insert(ports[2].inputs[0].clone(), ports[0].outputs[0].clone());
//!         mapping
//!     })
//!     .join(&[a, b, c])?;
//! ```

pub mod ports;

pub use ports::{model_ports, remap_inputs, wire_adjacent, ModelPort, PortMapping};

use std::collections::HashSet;

use crate::builder::cleanup::prune_graph;
use crate::error::{OnnxResult, TransformError};
use crate::graph::DependencyGraph;
use crate::library::{union_configurations, union_functions, union_metadata_props};
use crate::opset::union_opsets;
use crate::proto::{GraphProto, ModelProto, NodeProto};
use crate::rename::{rename_graph, rename_value_infos};

/// Caller-supplied port-mapping function
pub type IoMapping<'a> = Box<dyn Fn(&[ModelPort]) -> PortMapping + 'a>;

/// Join configuration
#[derive(Debug, Clone)]
pub struct JoinOptions {
    /// Prefix stem; graph `i` (1-based) is renamed under `{stem}{i}`
    pub prefix_stem: String,
    /// Reorder the composed nodes topologically.
    ///
    /// Sorting requires every composed node to carry a unique name. Models
    /// exported with repeated node names join only with sorting disabled;
    /// references are still checked for producers either way.
    pub sort_nodes: bool,
    /// Initializers kept even when no node reads them
    pub keep_initializers: HashSet<String>,
    /// Producer name stamped on the composed model
    pub producer_name: Option<String>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            prefix_stem: "g".to_string(),
            sort_nodes: true,
            keep_initializers: HashSet::new(),
            producer_name: None,
        }
    }
}

/// Builder for composing models
pub struct ModelJoiner<'a> {
    options: JoinOptions,
    io_mapping: Option<IoMapping<'a>>,
}

impl Default for ModelJoiner<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ModelJoiner<'a> {
    /// Create a joiner with default options
    pub fn new() -> Self {
        Self::with_options(JoinOptions::default())
    }

    /// Create a joiner with the given options
    pub fn with_options(options: JoinOptions) -> Self {
        Self {
            options,
            io_mapping: None,
        }
    }

    /// Set the port-mapping function
    pub fn io_mapping<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&[ModelPort]) -> PortMapping + 'a,
    {
        self.io_mapping = Some(Box::new(mapping));
        self
    }

    /// Protect an initializer from pruning
    pub fn keep_initializer(mut self, name: &str) -> Self {
        self.options.keep_initializers.insert(name.to_string());
        self
    }

    /// Enable or disable topological reordering
    pub fn sort_nodes(mut self, enable: bool) -> Self {
        self.options.sort_nodes = enable;
        self
    }

    /// Set the prefix stem
    pub fn prefix_stem(mut self, stem: &str) -> Self {
        self.options.prefix_stem = stem.to_string();
        self
    }

    /// Set producer name
    pub fn producer_name(mut self, name: &str) -> Self {
        self.options.producer_name = Some(name.to_string());
        self
    }

    /// Current options
    pub fn options(&self) -> &JoinOptions {
        &self.options
    }

    /// Compose the models into one
    pub fn join(&self, models: &[ModelProto]) -> OnnxResult<ModelProto> {
        let (first, last) = match (models.first(), models.last()) {
            (Some(first), Some(last)) => (first.require_graph()?, last.require_graph()?),
            _ => {
                return Err(TransformError::InvalidModel(
                    "at least one model is required to join".to_string(),
                ))
            }
        };
        let graphs = models
            .iter()
            .map(ModelProto::require_graph)
            .collect::<OnnxResult<Vec<&GraphProto>>>()?;
        let prefixes: Vec<String> = (1..=graphs.len())
            .map(|i| format!("{}{}", self.options.prefix_stem, i))
            .collect();

        let inputs = rename_value_infos(&first.input, &prefixes[0]);
        let outputs = rename_value_infos(&last.output, &prefixes[prefixes.len() - 1]);

        let ports = model_ports(&graphs, &prefixes);
        let mut mapping = match &self.io_mapping {
            Some(io_mapping) => io_mapping(&ports),
            None => PortMapping::new(),
        };
        wire_adjacent(&ports, &mut mapping)?;

        let mut graph = GraphProto {
            input: inputs,
            output: outputs,
            name: graphs
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join("_"),
            ..Default::default()
        };
        for (source, prefix) in graphs.iter().zip(&prefixes) {
            let renamed = rename_graph(source, prefix)?;
            log::debug!(
                "graph '{}' renamed under '{}': {} nodes, {} initializers",
                source.name,
                prefix,
                renamed.nodes.len(),
                renamed.initializers.len()
            );
            graph.node.extend(renamed.nodes);
            graph.initializer.extend(renamed.initializers);
            graph.sparse_initializer.extend(renamed.sparse_initializers);
            graph.value_info.extend(renamed.value_info);
            graph
                .quantization_annotation
                .extend(renamed.quantization_annotation);
        }

        for key in ports::unused_mapping_keys(&graph.node, &mapping) {
            log::warn!("port mapping entry '{}' names no consumer", key);
        }
        graph.node = remap_inputs(std::mem::take(&mut graph.node), &mapping);

        let (mut graph, stats) = prune_graph(&graph, &self.options.keep_initializers);
        log::debug!(
            "pruned {} initializers and {} sparse initializers",
            stats.initializers_removed,
            stats.sparse_initializers_removed
        );
        graph.node = self.order_nodes(&graph)?;

        let ir_version = models
            .iter()
            .map(|m| m.ir_version)
            .max()
            .filter(|&v| v > 0)
            .unwrap_or(crate::IR_VERSION);

        if models.iter().any(|m| !m.training_info.is_empty()) {
            log::warn!("training info refers to the source graphs and is not carried over");
        }

        log::debug!(
            "joined {} models into '{}' with {} nodes",
            models.len(),
            graph.name,
            graph.node.len()
        );

        Ok(ModelProto {
            ir_version,
            opset_import: union_opsets(models),
            producer_name: self.options.producer_name.clone().unwrap_or_default(),
            graph: Some(graph),
            metadata_props: union_metadata_props(models),
            functions: union_functions(models),
            configuration: union_configurations(models),
            ..Default::default()
        })
    }

    /// Validate references, then sort unless disabled
    fn order_nodes(&self, graph: &GraphProto) -> OnnxResult<Vec<NodeProto>> {
        let deps = DependencyGraph::from_graph(graph)?;
        if !self.options.sort_nodes {
            return Ok(graph.node.clone());
        }

        let order = deps.order().map_err(|err| match err {
            TransformError::NamingContractViolation(msg) => TransformError::NamingContractViolation(
                format!("{}; join with sort_nodes(false) to keep the concatenated order", msg),
            ),
            other => other,
        })?;
        Ok(order.into_iter().map(|id| deps.node(id).clone()).collect())
    }
}

/// Join models with default positional wiring
pub fn join_models(models: &[ModelProto]) -> OnnxResult<ModelProto> {
    ModelJoiner::new().join(models)
}

/// Join models with a port-mapping function overriding positional wiring
pub fn join_models_with<F>(models: &[ModelProto], io_mapping: F) -> OnnxResult<ModelProto>
where
    F: Fn(&[ModelPort]) -> PortMapping,
{
    ModelJoiner::new().io_mapping(io_mapping).join(models)
}
