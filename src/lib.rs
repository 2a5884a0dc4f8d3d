// Layer-conversion equivalence checks
//
// Build a small model, convert it to the IR, run both and check they agree.

pub use convcheck_core as core;
pub use convcheck_harness as harness;
pub use convcheck_ir as ir;
pub use convcheck_keras as keras;
pub use convcheck_providers as providers;

// Re-export commonly used types
pub use convcheck_core::logging::{init_logging, LogLevel, LoggingConfig};
pub use convcheck_core::{DataType, DeviceKind, Precision, Tensor};
pub use convcheck_harness::{
    run_equivalence_test, BuiltModel, EquivalenceHarness, EquivalenceReport, HarnessConfig,
    HarnessError, LayerTestParams, MismatchReport, StructuralReference, Tolerance,
};
pub use convcheck_ir::{IrConverter, IrVersion, ModelConverter};
pub use convcheck_keras::{
    Cropping1D, Cropping2D, Cropping3D, DataFormat, FrameworkSession, Model, SymbolicTensor,
};
pub use convcheck_providers::{ExecutionProvider, ProviderRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        run_equivalence_test, BuiltModel, Cropping2D, DataFormat, DataType, DeviceKind,
        FrameworkSession, HarnessConfig, HarnessError, LayerTestParams, Model, Precision,
        Tensor,
    };
}
