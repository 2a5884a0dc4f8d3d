//! Layer-conversion equivalence harness
//!
//! Checks that converting a model to the IR preserves what it computes. For
//! one parametrized case the harness builds the native model in a fresh
//! [`FrameworkSession`](convcheck_keras::FrameworkSession), converts it,
//! feeds both sides the same seeded inputs and compares the outputs within a
//! precision-dependent tolerance.
//!
//! Failures are typed ([`HarnessError`]) and carry enough context to locate
//! the divergence; a value mismatch names the output and the coordinate of
//! the worst offending element.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod compare;
pub mod config;
mod error;
pub mod harness;
pub mod inputs;
pub mod params;
pub mod reference;

pub use compare::{compare_outputs, ComparisonSummary, MismatchReport, Tolerance};
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use harness::{run_equivalence_test, BuiltModel, EquivalenceHarness, EquivalenceReport, Stage};
pub use inputs::generate_inputs;
pub use params::{InputSpec, LayerTestParams};
pub use reference::StructuralReference;
