//! Conversion of native models into the convcheck IR.
//!
//! The [`IrConverter`] lowers each supported layer of a
//! [`convcheck_keras::Model`] into IR nodes, validates the resulting
//! [`ModelGraph`](convcheck_core::ModelGraph) and writes it as a JSON artifact.
//! Providers later re-read the artifact and execute it through the
//! [`OperatorRegistry`].

mod artifact;
mod converter;
mod error;
pub mod ops;
mod version;

pub use artifact::{read_artifact, write_artifact, ConvertedModel, IrArtifact, ARTIFACT_EXTENSION};
pub use converter::{ConversionOptions, IrConverter, ModelConverter, PRODUCER_NAME};
pub use error::{IrError, Result};
pub use ops::{IdentityOp, IrOperator, OperatorRegistry, SliceOp};
pub use version::IrVersion;
