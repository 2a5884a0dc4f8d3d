//! Expected structure of a converted graph.

use crate::error::{HarnessError, Result};
use convcheck_core::ModelGraph;
use serde::{Deserialize, Serialize};

/// Operator sequence and output shapes a converted graph must have.
///
/// An empty `output_shapes` skips the shape check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuralReference {
    /// Operator types in topological order.
    pub ops: Vec<String>,
    /// Declared graph output shapes; 0 marks a dynamic dimension.
    pub output_shapes: Vec<Vec<usize>>,
}

impl StructuralReference {
    /// Reference expecting exactly `ops`.
    pub fn new<I, S>(ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ops: ops.into_iter().map(Into::into).collect(),
            output_shapes: Vec::new(),
        }
    }

    /// Also expect these output shapes.
    pub fn with_output_shapes(mut self, shapes: Vec<Vec<usize>>) -> Self {
        self.output_shapes = shapes;
        self
    }

    /// Report the first divergence between `graph` and this reference.
    pub fn check(&self, graph: &ModelGraph) -> Result<()> {
        let ops = graph
            .op_sequence()
            .map_err(|e| HarnessError::StructuralMismatch(e.to_string()))?;

        if let Some(position) = self.ops.iter().zip(&ops).position(|(want, got)| want != got) {
            return Err(HarnessError::StructuralMismatch(format!(
                "node {}: expected {}, found {}",
                position, self.ops[position], ops[position]
            )));
        }
        if self.ops.len() != ops.len() {
            return Err(HarnessError::StructuralMismatch(format!(
                "expected {} nodes ({:?}), found {} ({:?})",
                self.ops.len(),
                self.ops,
                ops.len(),
                ops
            )));
        }

        if self.output_shapes.is_empty() {
            return Ok(());
        }
        let shapes: Vec<&Vec<usize>> = graph.outputs.iter().map(|info| &info.shape).collect();
        if shapes.len() != self.output_shapes.len() {
            return Err(HarnessError::StructuralMismatch(format!(
                "expected {} outputs, found {}",
                self.output_shapes.len(),
                shapes.len()
            )));
        }
        for (index, (want, got)) in self.output_shapes.iter().zip(shapes).enumerate() {
            if want != got {
                return Err(HarnessError::StructuralMismatch(format!(
                    "output {}: expected shape {:?}, found {:?}",
                    index, want, got
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convcheck_core::{DataType, GraphNode, TensorInfo};
    use std::collections::BTreeMap;

    fn graph(ops: &[&str]) -> ModelGraph {
        let mut graph = ModelGraph::new();
        for (i, op) in ops.iter().enumerate() {
            graph.add_node(GraphNode {
                id: 0,
                op_type: op.to_string(),
                name: None,
                inputs: vec![format!("t{}", i)],
                outputs: vec![format!("t{}", i + 1)],
                attributes: BTreeMap::new(),
            });
        }
        graph.connect_by_tensor_names().unwrap();
        graph.outputs.push(TensorInfo {
            name: format!("t{}", ops.len()),
            shape: vec![0, 4],
            data_type: DataType::F32,
        });
        graph
    }

    #[test]
    fn test_matching_reference() {
        let reference =
            StructuralReference::new(["Slice", "Identity"]).with_output_shapes(vec![vec![0, 4]]);
        reference.check(&graph(&["Slice", "Identity"])).unwrap();
    }

    #[test]
    fn test_first_divergence_reported() {
        let err = StructuralReference::new(["Slice", "Slice"])
            .check(&graph(&["Slice", "Identity"]))
            .unwrap_err();
        assert!(err.to_string().contains("node 1: expected Slice, found Identity"));
    }

    #[test]
    fn test_length_and_shape_divergence() {
        assert!(StructuralReference::new(["Slice"])
            .check(&graph(&["Slice", "Identity"]))
            .is_err());
        assert!(StructuralReference::new(["Slice"])
            .with_output_shapes(vec![vec![2, 4]])
            .check(&graph(&["Slice"]))
            .is_err());
    }
}
