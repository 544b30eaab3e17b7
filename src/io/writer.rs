//! ONNX model writer
//!
//! Save models to files or bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use prost::Message;

use crate::error::{OnnxResult, TransformError};
use crate::proto::ModelProto;

/// Save an ONNX model to a file
///
/// # Example
///
/// ```ignore
/// use onnx_compose::io::save_model;
///
/// save_model(&model, "composed.onnx")?;
/// ```
pub fn save_model<P: AsRef<Path>>(model: &ModelProto, path: P) -> OnnxResult<()> {
    let path = path.as_ref();

    let file = File::create(path).map_err(|e| {
        TransformError::InvalidModel(format!("Failed to create file '{}': {}", path.display(), e))
    })?;

    let mut writer = BufWriter::new(file);
    let bytes = model_to_bytes(model);

    writer.write_all(&bytes)?;
    writer.flush()?;

    log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Encode an ONNX model to bytes
pub fn model_to_bytes(model: &ModelProto) -> Vec<u8> {
    model.encode_to_vec()
}
