//! ONNX I/O module
//!
//! Thin helpers to load and save models around the composition entry points.
//!
//! # Example
//!
//! ```ignore
//! use onnx_compose::io::{join_files, load_model, save_model};
//!
//! // Compose a pipeline straight from files
//! join_files(&["pre.onnx", "net.onnx", "post.onnx"], "pipeline.onnx")?;
//! ```

pub mod reader;
pub mod writer;

// Re-exports
pub use reader::{load_model, load_model_from_bytes, load_models};
pub use writer::{model_to_bytes, save_model};

use std::path::Path;

use crate::compose::join_models;
use crate::error::OnnxResult;
use crate::proto::ModelProto;

/// Join model files with positional wiring and save the result
pub fn join_files<P: AsRef<Path>, Q: AsRef<Path>>(inputs: &[P], output: Q) -> OnnxResult<ModelProto> {
    let models = load_models(inputs)?;
    let joined = join_models(&models)?;
    save_model(&joined, output)?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_graph, make_model, make_node, make_opsetid, make_value_info};

    fn unary_model(op: &str, input: &str, output: &str) -> ModelProto {
        let graph = make_graph(
            vec![make_node(op, &[input], &[output], op)],
            op,
            vec![make_value_info(input)],
            vec![make_value_info(output)],
            vec![],
            vec![],
        );
        make_model(graph, vec![make_opsetid("", 13)])
    }

    #[test]
    fn test_join_files() {
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let first = dir.join(format!("onnx_compose_first_{}.onnx", pid));
        let second = dir.join(format!("onnx_compose_second_{}.onnx", pid));
        let output = dir.join(format!("onnx_compose_joined_{}.onnx", pid));

        save_model(&unary_model("Relu", "x", "y"), &first).unwrap();
        save_model(&unary_model("Tanh", "y", "z"), &second).unwrap();

        let joined = join_files(&[&first, &second], &output).unwrap();
        let reloaded = load_model(&output).unwrap();
        assert_eq!(joined, reloaded);
        assert_eq!(reloaded.graph.unwrap().node.len(), 2);

        for path in [&first, &second, &output] {
            std::fs::remove_file(path).ok();
        }
    }
}
