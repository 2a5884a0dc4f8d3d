//! Functional models and native execution.

use crate::error::{FrameworkError, Result};
use crate::layers::LayerNode;
use crate::session::{FrameworkSession, SymbolicTensor};
use convcheck_core::Tensor;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// A model graph extracted from a session between inputs and outputs.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    inputs: Vec<SymbolicTensor>,
    outputs: Vec<SymbolicTensor>,
    /// Layers in execution order.
    layers: Vec<LayerNode>,
}

impl Model {
    /// Collect the layers connecting `inputs` to `outputs`.
    ///
    /// Fails if an output depends on a tensor that is neither produced by a
    /// layer nor listed in `inputs`.
    pub fn new(
        session: &mut FrameworkSession,
        inputs: Vec<SymbolicTensor>,
        outputs: Vec<SymbolicTensor>,
    ) -> Result<Self> {
        if inputs.is_empty() || outputs.is_empty() {
            return Err(FrameworkError::InvalidModel(
                "a model needs at least one input and one output".to_string(),
            ));
        }
        for tensor in inputs.iter().chain(outputs.iter()) {
            session.check_known(tensor)?;
        }
        for input in &inputs {
            if session.producer_index(&input.name)?.is_some() {
                return Err(FrameworkError::InvalidModel(format!(
                    "'{}' is a layer output, not an input",
                    input.name
                )));
            }
        }

        let input_names: BTreeSet<&str> = inputs.iter().map(|t| t.name.as_str()).collect();
        let mut reached: BTreeSet<usize> = BTreeSet::new();
        let mut pending: Vec<String> = outputs.iter().map(|t| t.name.clone()).collect();
        let mut visited: BTreeSet<String> = BTreeSet::new();

        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            match session.producer_index(&name)? {
                Some(index) => {
                    pending.push(session.layer_at(index).input.clone());
                    reached.insert(index);
                }
                None if input_names.contains(name.as_str()) => {}
                None => {
                    return Err(FrameworkError::InvalidModel(format!(
                        "outputs depend on '{}', which is not a model input",
                        name
                    )));
                }
            }
        }

        // A layer only consumes tensors that already exist, so registration
        // order is an execution order.
        let layers: Vec<LayerNode> = reached
            .into_iter()
            .map(|index| session.layer_at(index).clone())
            .collect();
        let name = session.unique_name("model");

        debug!(model = %name, layers = layers.len(), "model assembled");
        Ok(Self {
            name,
            inputs,
            outputs,
            layers,
        })
    }

    /// Replace the generated model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared inputs in feed order.
    pub fn inputs(&self) -> &[SymbolicTensor] {
        &self.inputs
    }

    /// Declared outputs in result order.
    pub fn outputs(&self) -> &[SymbolicTensor] {
        &self.outputs
    }

    /// Layers in execution order.
    pub fn layers(&self) -> &[LayerNode] {
        &self.layers
    }

    /// Run the model natively on batch-inclusive inputs.
    #[instrument(skip(self, inputs), fields(model = %self.name))]
    pub fn predict(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        if inputs.len() != self.inputs.len() {
            return Err(FrameworkError::Shape(format!(
                "model '{}' expects {} inputs, got {}",
                self.name,
                self.inputs.len(),
                inputs.len()
            )));
        }

        let mut values: HashMap<&str, Tensor> = HashMap::new();
        for (declared, tensor) in self.inputs.iter().zip(inputs) {
            let shape = tensor.shape();
            if shape.len() != declared.shape.len() + 1 || shape[1..] != declared.shape[..] {
                return Err(FrameworkError::Shape(format!(
                    "input '{}' expects (batch, {:?}), got {:?}",
                    declared.name, declared.shape, shape
                )));
            }
            values.insert(declared.name.as_str(), tensor.clone());
        }

        for layer in &self.layers {
            let input = values
                .get(layer.input.as_str())
                .ok_or_else(|| FrameworkError::UnknownTensor(layer.input.clone()))?;
            let output = layer.spec.execute(&layer.name, input)?;
            debug!(layer = %layer.name, shape = ?output.shape(), "layer executed");
            values.insert(layer.output.as_str(), output);
        }

        self.outputs
            .iter()
            .map(|output| {
                values
                    .get(output.name.as_str())
                    .cloned()
                    .ok_or_else(|| FrameworkError::UnknownTensor(output.name.clone()))
            })
            .collect()
    }
}
