//! ONNX model reader
//!
//! Load models from files or bytes.

use std::fs;
use std::path::Path;

use prost::Message;

use crate::error::{OnnxResult, TransformError};
use crate::proto::ModelProto;

/// Load an ONNX model from a file path
///
/// # Example
///
/// ```ignore
/// use onnx_compose::io::load_model;
///
/// let model = load_model("encoder.onnx")?;
/// ```
pub fn load_model<P: AsRef<Path>>(path: P) -> OnnxResult<ModelProto> {
    let path = path.as_ref();

    let buffer = fs::read(path).map_err(|e| {
        TransformError::InvalidModel(format!("Failed to read file '{}': {}", path.display(), e))
    })?;

    log::debug!("loaded {} bytes from {}", buffer.len(), path.display());
    load_model_from_bytes(&buffer)
}

/// Load an ONNX model from bytes
pub fn load_model_from_bytes(bytes: &[u8]) -> OnnxResult<ModelProto> {
    Ok(ModelProto::decode(bytes)?)
}

/// Load several models, keeping their order
pub fn load_models<P: AsRef<Path>>(paths: &[P]) -> OnnxResult<Vec<ModelProto>> {
    paths.iter().map(load_model).collect()
}
