use thiserror::Error;

/// Result type for model construction and native execution.
pub type Result<T> = std::result::Result<T, FrameworkError>;

/// Errors raised while building or running a native model.
#[derive(Error, Debug)]
pub enum FrameworkError {
    /// Cropping amounts do not fit the input, or the layer configuration is invalid.
    #[error("Invalid cropping for layer '{layer}': {reason}")]
    InvalidCropping {
        /// Layer name.
        layer: String,
        /// What is wrong with the cropping.
        reason: String,
    },

    /// Rank or dimension mismatch.
    #[error("Shape error: {0}")]
    Shape(String),

    /// A symbolic tensor that the session does not know about.
    #[error("Unknown tensor '{0}'")]
    UnknownTensor(String),

    /// A name is already taken in this session.
    #[error("Duplicate name '{0}'")]
    DuplicateName(String),

    /// Model inputs/outputs do not form a valid graph.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Failure in the tensor backend.
    #[error("Tensor error: {0}")]
    Tensor(#[from] anyhow::Error),
}
