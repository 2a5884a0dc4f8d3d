use crate::compare::MismatchReport;
use crate::harness::Stage;
use convcheck_core::DeviceKind;
use convcheck_ir::IrError;
use convcheck_keras::FrameworkError;
use thiserror::Error;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Why an equivalence case failed. Every variant is terminal for the case.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Test parameters are malformed or disagree with the built model.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Invalid harness configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The model-building callback failed.
    #[error("Model construction failed: {0}")]
    ModelConstruction(#[from] FrameworkError),

    /// The converter rejected the model or could not write the artifact.
    #[error("Conversion failed: {0}")]
    Conversion(#[from] IrError),

    /// The requested device cannot be used in this build or on this host.
    #[error("Device {device} not available: {reason}")]
    DeviceUnavailable {
        /// Requested device.
        device: DeviceKind,
        /// Provider creation error.
        reason: String,
    },

    /// Native or converted execution failed.
    #[error("Execution failed while reaching {stage}: {source}")]
    Execution {
        /// Stage being entered when execution failed.
        stage: Stage,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// Output counts or shapes differ between native and converted results.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Values differ beyond tolerance.
    #[error("Output mismatch: {0}")]
    Mismatch(MismatchReport),

    /// The converted graph does not have the expected structure.
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    /// Filesystem failure around the scratch directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Short name of the failure kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Precondition(_) => "precondition",
            HarnessError::Config(_) => "config",
            HarnessError::ModelConstruction(_) => "model_construction",
            HarnessError::Conversion(_) => "conversion",
            HarnessError::DeviceUnavailable { .. } => "device_unavailable",
            HarnessError::Execution { .. } => "execution",
            HarnessError::ShapeMismatch(_) => "shape_mismatch",
            HarnessError::Mismatch(_) => "mismatch",
            HarnessError::StructuralMismatch(_) => "structural_mismatch",
            HarnessError::Io(_) => "io",
        }
    }
}
