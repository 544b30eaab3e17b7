//! ONNX Protocol Buffer types
//!
//! This module exposes the `prost` message types for the ONNX subset the
//! composer reads and writes. Additional helper methods and constructors are
//! provided in the `extensions` submodule.

pub mod onnx;

// Re-export commonly used types at module level
pub use onnx::{
    AttributeProto, DeviceConfigurationProto, FunctionProto, GraphProto, ModelProto,
    NodeDeviceConfigurationProto, NodeProto, OperatorSetIdProto, SparseTensorProto,
    StringStringEntryProto, TensorAnnotation, TensorProto, TensorShapeProto, TrainingInfoProto,
    TypeProto, ValueInfoProto,
};

// Re-export submodules for nested types
pub use onnx::attribute_proto;
pub use onnx::tensor_proto;
pub use onnx::tensor_shape_proto;
pub use onnx::type_proto;

/// Extension methods for ONNX protobuf types
pub mod extensions;
