//! Framework session: the context every model is built in.

use crate::error::{FrameworkError, Result};
use crate::layers::LayerNode;
use convcheck_core::DataType;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Handle to a tensor inside a [`FrameworkSession`] graph.
///
/// Shapes exclude the batch dimension, like framework `Input` shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicTensor {
    /// Unique tensor name within the session.
    pub name: String,
    /// Static shape without the batch dimension.
    pub shape: Vec<usize>,
    /// Element type.
    pub dtype: DataType,
}

#[derive(Debug, Clone)]
struct TensorRecord {
    tensor: SymbolicTensor,
    /// Index into `layers` of the producing layer; `None` for inputs.
    producer: Option<usize>,
}

/// Owns the graph under construction and the name counters.
///
/// One session is created per test case and dropped when the case ends;
/// [`FrameworkSession::clear`] resets it for reuse.
pub struct FrameworkSession {
    id: Uuid,
    name_counts: HashMap<String, usize>,
    tensors: HashMap<String, TensorRecord>,
    layers: Vec<LayerNode>,
    created_at: Instant,
}

impl FrameworkSession {
    /// Create an empty session.
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, "framework session created");
        Self {
            id,
            name_counts: HashMap::new(),
            tensors: HashMap::new(),
            layers: Vec::new(),
            created_at: Instant::now(),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drop every tensor, layer and name counter.
    pub fn clear(&mut self) {
        debug!(
            session_id = %self.id,
            layers = self.layers.len(),
            "clearing framework session"
        );
        self.name_counts.clear();
        self.tensors.clear();
        self.layers.clear();
    }

    /// Number of layers registered so far.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Next free name for `base`: `base`, `base_1`, `base_2`, ...
    pub fn unique_name(&mut self, base: &str) -> String {
        let count = self.name_counts.entry(base.to_string()).or_insert(0);
        let name = if *count == 0 {
            base.to_string()
        } else {
            format!("{}_{}", base, count)
        };
        *count += 1;
        name
    }

    /// Declare a model input. `shape` excludes the batch dimension.
    pub fn input(&mut self, shape: &[usize], dtype: DataType, name: &str) -> Result<SymbolicTensor> {
        if shape.contains(&0) {
            return Err(FrameworkError::Shape(format!(
                "input '{}' has a zero-sized dimension: {:?}",
                name, shape
            )));
        }
        let tensor = SymbolicTensor {
            name: name.to_string(),
            shape: shape.to_vec(),
            dtype,
        };
        self.insert_tensor(tensor.clone(), None)?;
        Ok(tensor)
    }

    /// Look up a tensor by name.
    pub fn tensor(&self, name: &str) -> Option<&SymbolicTensor> {
        self.tensors.get(name).map(|record| &record.tensor)
    }

    /// Layer producing `name`, if it is not an input.
    pub fn producer(&self, name: &str) -> Result<Option<&LayerNode>> {
        Ok(self.producer_index(name)?.map(|index| &self.layers[index]))
    }

    pub(crate) fn producer_index(&self, name: &str) -> Result<Option<usize>> {
        self.tensors
            .get(name)
            .map(|record| record.producer)
            .ok_or_else(|| FrameworkError::UnknownTensor(name.to_string()))
    }

    pub(crate) fn layer_at(&self, index: usize) -> &LayerNode {
        &self.layers[index]
    }

    pub(crate) fn check_known(&self, tensor: &SymbolicTensor) -> Result<()> {
        match self.tensors.get(&tensor.name) {
            Some(record) if record.tensor == *tensor => Ok(()),
            _ => Err(FrameworkError::UnknownTensor(tensor.name.clone())),
        }
    }

    pub(crate) fn register_layer(&mut self, layer: LayerNode, output: SymbolicTensor) -> Result<()> {
        if self.layers.iter().any(|existing| existing.name == layer.name) {
            return Err(FrameworkError::DuplicateName(layer.name));
        }
        let index = self.layers.len();
        self.insert_tensor(output, Some(index))?;
        debug!(layer = %layer.name, class = layer.spec.class_name(), "layer registered");
        self.layers.push(layer);
        Ok(())
    }

    fn insert_tensor(&mut self, tensor: SymbolicTensor, producer: Option<usize>) -> Result<()> {
        if self.tensors.contains_key(&tensor.name) {
            return Err(FrameworkError::DuplicateName(tensor.name));
        }
        self.tensors
            .insert(tensor.name.clone(), TensorRecord { tensor, producer });
        Ok(())
    }
}

impl Default for FrameworkSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameworkSession {
    fn drop(&mut self) {
        debug!(
            session_id = %self.id,
            layers = self.layers.len(),
            lifetime_ms = self.created_at.elapsed().as_millis() as u64,
            "framework session torn down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_follow_counter() {
        let mut session = FrameworkSession::new();
        assert_eq!(session.unique_name("cropping2d"), "cropping2d");
        assert_eq!(session.unique_name("cropping2d"), "cropping2d_1");
        assert_eq!(session.unique_name("model"), "model");
        session.clear();
        assert_eq!(session.unique_name("cropping2d"), "cropping2d");
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let mut session = FrameworkSession::new();
        session.input(&[2, 2, 1], DataType::F32, "x").unwrap();
        assert!(matches!(
            session.input(&[2, 2, 1], DataType::F32, "x"),
            Err(FrameworkError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_zero_dim_input_rejected() {
        let mut session = FrameworkSession::new();
        assert!(session.input(&[0, 3], DataType::F32, "x").is_err());
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(FrameworkSession::new().id(), FrameworkSession::new().id());
    }
}
