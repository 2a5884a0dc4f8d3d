// IR operator implementations on the Candle-backed tensor.
//
// Providers resolve every node's op_type through an OperatorRegistry, so a
// converter may only emit operators registered here.

mod tensor_ops;

pub use tensor_ops::*;

use crate::error::{IrError, Result};
use convcheck_core::{NodeAttribute, Tensor};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Attribute map of an IR node.
pub type Attributes = BTreeMap<String, NodeAttribute>;

/// Trait for IR operator execution
pub trait IrOperator: Send + Sync {
    /// Get the operator type name
    fn op_type(&self) -> &str;

    /// Execute the operator
    fn execute(&self, inputs: &[&Tensor], attributes: &Attributes) -> Result<Vec<Tensor>>;

    /// Check attributes without running the operator
    fn validate(&self, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }
}

/// Registry of executable IR operators
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, Arc<dyn IrOperator>>,
}

impl OperatorRegistry {
    /// Create a registry with all built-in operators
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SliceOp));
        registry.register(Arc::new(IdentityOp));
        registry
    }

    /// Create a registry with no operators
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Register an operator, replacing any operator of the same type
    pub fn register(&mut self, op: Arc<dyn IrOperator>) {
        self.operators.insert(op.op_type().to_string(), op);
    }

    /// Get an operator by name
    pub fn get(&self, op_type: &str) -> Result<&dyn IrOperator> {
        self.operators
            .get(op_type)
            .map(|op| op.as_ref())
            .ok_or_else(|| IrError::UnsupportedOperator {
                op_type: op_type.to_string(),
            })
    }

    /// Check if an operator is supported
    pub fn is_supported(&self, op_type: &str) -> bool {
        self.operators.contains_key(op_type)
    }

    /// Sorted list of supported operators
    pub fn supported_operators(&self) -> Vec<String> {
        let mut ops: Vec<String> = self.operators.keys().cloned().collect();
        ops.sort();
        ops
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.supported_operators())
            .finish()
    }
}

/// Read an integer-list attribute.
pub(crate) fn ints_attr(attributes: &Attributes, name: &str) -> Result<Option<Vec<i64>>> {
    match attributes.get(name) {
        None => Ok(None),
        Some(NodeAttribute::IntArray(values)) => Ok(Some(values.clone())),
        Some(other) => Err(IrError::InvalidAttribute {
            name: name.to_string(),
            reason: format!("expected an integer list, found {:?}", other),
        }),
    }
}
