//! The contract between a test case and the harness.

use crate::error::{HarnessError, Result};
use convcheck_core::DataType;
use convcheck_keras::Model;
use std::fmt;

/// One model input as the harness feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Input tensor name.
    pub name: String,
    /// Batch-inclusive shape.
    pub shape: Vec<usize>,
    /// Element type.
    pub dtype: DataType,
}

/// Parameters of one parametrized layer test case.
///
/// Implementors are plain immutable structs; the harness only reads them.
pub trait LayerTestParams: fmt::Debug {
    /// Names of the model inputs, in feed order.
    fn input_names(&self) -> &[String];

    /// Batch-inclusive shapes of the model inputs, parallel to
    /// [`LayerTestParams::input_names`].
    fn input_shapes(&self) -> &[Vec<usize>];

    /// Element type of every input.
    fn input_type(&self) -> DataType {
        DataType::F32
    }

    /// Human-readable case label for logs and reports.
    fn describe(&self) -> String {
        format!("{:?}", self)
    }

    /// Names, shapes and type zipped together.
    fn input_specs(&self) -> Vec<InputSpec> {
        self.input_names()
            .iter()
            .zip(self.input_shapes())
            .map(|(name, shape)| InputSpec {
                name: name.clone(),
                shape: shape.clone(),
                dtype: self.input_type(),
            })
            .collect()
    }
}

/// Checks that need nothing but the parameters.
pub fn check_params<P: LayerTestParams + ?Sized>(params: &P) -> Result<()> {
    let names = params.input_names();
    let shapes = params.input_shapes();

    if shapes.is_empty() {
        return Err(HarnessError::Precondition(
            "at least one input shape is required".to_string(),
        ));
    }
    if names.len() != shapes.len() {
        return Err(HarnessError::Precondition(format!(
            "{} input names for {} input shapes",
            names.len(),
            shapes.len()
        )));
    }
    for (name, shape) in names.iter().zip(shapes) {
        if shape.is_empty() || shape.contains(&0) {
            return Err(HarnessError::Precondition(format!(
                "input '{}' needs a non-empty shape of positive dimensions, got {:?}",
                name, shape
            )));
        }
    }
    if !params.input_type().is_float() {
        return Err(HarnessError::Precondition(format!(
            "input type {} is not a floating point type",
            params.input_type()
        )));
    }
    Ok(())
}

/// Checks that the parameters describe the inputs of `model`.
pub fn check_params_against_model<P: LayerTestParams + ?Sized>(
    params: &P,
    model: &Model,
) -> Result<()> {
    let inputs = model.inputs();
    if params.input_names().len() != inputs.len() {
        return Err(HarnessError::Precondition(format!(
            "{} input names given, model '{}' has {} inputs",
            params.input_names().len(),
            model.name(),
            inputs.len()
        )));
    }

    for (shape, input) in params.input_shapes().iter().zip(inputs) {
        if shape.len() != input.shape.len() + 1 || shape[1..] != input.shape[..] {
            return Err(HarnessError::Precondition(format!(
                "shape {:?} does not fit input '{}' of shape (batch, {:?})",
                shape, input.name, input.shape
            )));
        }
    }
    Ok(())
}
