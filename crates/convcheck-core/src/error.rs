use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing or validating core types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A selector string (device, precision) did not name a known value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A data type name is not recognised.
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),
}
