use thiserror::Error;

/// Result type for conversion and IR execution.
pub type Result<T> = std::result::Result<T, IrError>;

/// Errors raised by the converter, the artifact reader and IR operators.
#[derive(Error, Debug)]
pub enum IrError {
    /// Requested IR version is not produced by this converter.
    #[error("Unsupported IR version {version} (supported: {supported:?})")]
    UnsupportedIrVersion {
        /// Requested version.
        version: u32,
        /// Versions this converter emits.
        supported: &'static [u32],
    },

    /// A layer with no IR lowering.
    #[error("Layer '{layer}' of class {class_name} cannot be converted")]
    UnsupportedLayer {
        /// Layer name.
        layer: String,
        /// Layer class.
        class_name: String,
    },

    /// An operator missing from the registry.
    #[error("Unsupported operator: {op_type}")]
    UnsupportedOperator {
        /// Operator type.
        op_type: String,
    },

    /// Input shape overrides that do not fit the model.
    #[error("Invalid input shape: {0}")]
    InvalidInputShape(String),

    /// Structural problem in a graph.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Missing or malformed node attribute.
    #[error("Invalid attribute '{name}': {reason}")]
    InvalidAttribute {
        /// Attribute name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Artifact (de)serialisation failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while writing or reading artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure in the tensor backend.
    #[error("Tensor error: {0}")]
    Tensor(#[from] anyhow::Error),
}
