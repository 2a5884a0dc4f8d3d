//! The execution provider interface.

use crate::Result;
use convcheck_core::{DeviceKind, ModelGraph, Precision, Tensor};

/// Runs IR graphs on one device at one precision.
pub trait ExecutionProvider: Send + Sync {
    /// Device the provider executes on.
    fn device(&self) -> DeviceKind;

    /// Precision the provider computes in.
    fn precision(&self) -> Precision;

    /// Check if an operator type can be executed.
    fn supports(&self, op_type: &str) -> bool;

    /// Execute `graph` on batch-inclusive `inputs` given in graph input order.
    ///
    /// Outputs are returned on the CPU as F32, in graph output order.
    fn execute(&self, graph: &ModelGraph, inputs: &[Tensor]) -> Result<Vec<Tensor>>;

    /// Check that every node of `graph` can be executed.
    fn can_handle(&self, graph: &ModelGraph) -> Vec<bool> {
        graph
            .nodes()
            .iter()
            .map(|node| self.supports(&node.op_type))
            .collect()
    }
}
