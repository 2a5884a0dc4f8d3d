//! Fundamental data types shared across convcheck crates.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 32-bit IEEE float.
    F32,
    /// 16-bit IEEE float.
    F16,
    /// 16-bit brain float.
    BF16,
    /// 64-bit IEEE float.
    F64,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::F16 | DataType::BF16 => 2,
            DataType::F32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 => 8,
        }
    }

    /// Whether the type is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            DataType::F32 | DataType::F16 | DataType::BF16 | DataType::F64
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::F32 => "float32",
            DataType::F16 => "float16",
            DataType::BF16 => "bfloat16",
            DataType::F64 => "float64",
            DataType::U8 => "uint8",
            DataType::U32 => "uint32",
            DataType::I64 => "int64",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "float32" | "f32" | "fp32" => Ok(DataType::F32),
            "float16" | "f16" | "fp16" | "half" => Ok(DataType::F16),
            "bfloat16" | "bf16" => Ok(DataType::BF16),
            "float64" | "f64" | "double" => Ok(DataType::F64),
            "uint8" | "u8" => Ok(DataType::U8),
            "uint32" | "u32" => Ok(DataType::U32),
            "int64" | "i64" => Ok(DataType::I64),
            _ => Err(CoreError::UnknownDataType(s.to_string())),
        }
    }
}

/// Execution target for a converted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Host CPU.
    #[default]
    #[serde(rename = "CPU")]
    Cpu,
    /// CUDA GPU.
    #[serde(rename = "GPU")]
    Gpu,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => f.write_str("CPU"),
            DeviceKind::Gpu => f.write_str("GPU"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPU" => Ok(DeviceKind::Cpu),
            "GPU" => Ok(DeviceKind::Gpu),
            other => Err(CoreError::InvalidArgument(format!(
                "unknown device '{}', expected CPU or GPU",
                other
            ))),
        }
    }
}

/// Inference precision of a converted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    /// Full single precision.
    #[default]
    FP32,
    /// Half precision.
    FP16,
}

impl Precision {
    /// Tensor element type used when executing at this precision.
    pub fn data_type(self) -> DataType {
        match self {
            Precision::FP32 => DataType::F32,
            Precision::FP16 => DataType::F16,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::FP32 => f.write_str("FP32"),
            Precision::FP16 => f.write_str("FP16"),
        }
    }
}

impl FromStr for Precision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FP32" => Ok(Precision::FP32),
            "FP16" => Ok(Precision::FP16),
            other => Err(CoreError::InvalidArgument(format!(
                "unknown precision '{}', expected FP32 or FP16",
                other
            ))),
        }
    }
}

/// Index of a node inside a [`ModelGraph`].
pub type NodeId = usize;

/// Typed attribute attached to an IR node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NodeAttribute {
    /// Single integer.
    Int(i64),
    /// Single float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Integer list.
    IntArray(Vec<i64>),
    /// Float list.
    FloatArray(Vec<f64>),
}

/// A single operation in an IR graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Position of the node in the graph.
    pub id: NodeId,
    /// Operator type, resolved through an operator registry at execution time.
    pub op_type: String,
    /// Optional human readable name, usually the source layer name.
    pub name: Option<String>,
    /// Names of consumed tensors.
    pub inputs: Vec<String>,
    /// Names of produced tensors.
    pub outputs: Vec<String>,
    /// Operator attributes, ordered for stable serialisation.
    pub attributes: BTreeMap<String, NodeAttribute>,
}

/// Data dependency between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Producing node.
    pub from_node: NodeId,
    /// Consuming node.
    pub to_node: NodeId,
    /// Tensor carried along the edge.
    pub tensor_name: String,
}

/// Static description of a graph input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorInfo {
    /// Tensor name.
    pub name: String,
    /// Static shape, batch dimension included.
    pub shape: Vec<usize>,
    /// Element type.
    pub data_type: DataType,
}

/// IR model graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGraph {
    /// Nodes, indexed by [`NodeId`].
    pub nodes: Vec<GraphNode>,
    /// Data dependencies between nodes.
    pub edges: Vec<GraphEdge>,
    /// Graph inputs in feed order.
    pub inputs: Vec<TensorInfo>,
    /// Graph outputs in result order.
    pub outputs: Vec<TensorInfo>,
    /// Free-form metadata (producer, source model name, ...).
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse_is_case_insensitive() {
        assert_eq!("cpu".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!(" GPU ".parse::<DeviceKind>().unwrap(), DeviceKind::Gpu);
        assert!("npu".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_precision_parse_and_display() {
        let precision: Precision = "fp16".parse().unwrap();
        assert_eq!(precision, Precision::FP16);
        assert_eq!(precision.to_string(), "FP16");
        assert_eq!(precision.data_type(), DataType::F16);
        assert!("int8".parse::<Precision>().is_err());
    }

    #[test]
    fn test_data_type_aliases() {
        assert_eq!("float32".parse::<DataType>().unwrap(), DataType::F32);
        assert_eq!("FP16".parse::<DataType>().unwrap(), DataType::F16);
        assert_eq!(
            "complex64".parse::<DataType>(),
            Err(CoreError::UnknownDataType("complex64".to_string()))
        );
        assert_eq!(DataType::BF16.size_in_bytes(), 2);
        assert!(!DataType::I64.is_float());
    }

    #[test]
    fn test_node_attribute_serde_shape() {
        let attr = NodeAttribute::IntArray(vec![1, 2]);
        let json = serde_json::to_string(&attr).unwrap();
        assert_eq!(json, r#"{"type":"int_array","value":[1,2]}"#);
        let back: NodeAttribute = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attr);
    }
}
