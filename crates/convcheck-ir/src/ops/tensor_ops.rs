use super::{ints_attr, Attributes, IrOperator};
use crate::error::{IrError, Result};
use convcheck_core::Tensor;

/// Slice: keep `starts[i]..ends[i]` along `axes[i]`.
///
/// Negative bounds count from the end of the axis and are clamped to it.
/// Only unit steps are supported.
pub struct SliceOp;

impl SliceOp {
    fn bounds(attributes: &Attributes) -> Result<(Vec<i64>, Vec<i64>, Vec<i64>)> {
        let required = |name: &str| -> Result<Vec<i64>> {
            ints_attr(attributes, name)?.ok_or_else(|| IrError::InvalidAttribute {
                name: name.to_string(),
                reason: "Slice requires this attribute".to_string(),
            })
        };
        let starts = required("starts")?;
        let ends = required("ends")?;
        let axes = match ints_attr(attributes, "axes")? {
            Some(axes) => axes,
            None => (0..starts.len() as i64).collect(),
        };

        if starts.len() != ends.len() || starts.len() != axes.len() {
            return Err(IrError::InvalidAttribute {
                name: "starts/ends/axes".to_string(),
                reason: format!(
                    "length mismatch: {} starts, {} ends, {} axes",
                    starts.len(),
                    ends.len(),
                    axes.len()
                ),
            });
        }

        if let Some(steps) = ints_attr(attributes, "steps")? {
            if steps.len() != starts.len() || steps.iter().any(|&step| step != 1) {
                return Err(IrError::InvalidAttribute {
                    name: "steps".to_string(),
                    reason: format!("only unit steps are supported, got {:?}", steps),
                });
            }
        }

        Ok((starts, ends, axes))
    }

    fn resolve(index: i64, dim: usize) -> usize {
        let dim = dim as i64;
        let resolved = if index < 0 { index + dim } else { index };
        resolved.clamp(0, dim) as usize
    }
}

impl IrOperator for SliceOp {
    fn op_type(&self) -> &str {
        "Slice"
    }

    fn validate(&self, attributes: &Attributes) -> Result<()> {
        Self::bounds(attributes).map(|_| ())
    }

    fn execute(&self, inputs: &[&Tensor], attributes: &Attributes) -> Result<Vec<Tensor>> {
        if inputs.len() != 1 {
            return Err(IrError::InvalidGraph(format!(
                "Slice expects 1 input, got {}",
                inputs.len()
            )));
        }
        let input = inputs[0];
        let shape = input.shape();
        let (starts, ends, axes) = Self::bounds(attributes)?;

        let mut ranges = Vec::with_capacity(axes.len());
        for ((&start, &end), &axis) in starts.iter().zip(&ends).zip(&axes) {
            let rank = shape.len() as i64;
            let axis = if axis < 0 { axis + rank } else { axis };
            if axis < 0 || axis >= rank {
                return Err(IrError::InvalidAttribute {
                    name: "axes".to_string(),
                    reason: format!("axis {} out of range for rank {}", axis, rank),
                });
            }
            let axis = axis as usize;
            let dim = shape[axis];
            let start = Self::resolve(start, dim);
            let end = Self::resolve(end, dim).max(start);
            ranges.push((axis, start, end));
        }

        Ok(vec![input.slice_axes(&ranges)?])
    }
}

/// Identity: forwards its single input unchanged.
pub struct IdentityOp;

impl IrOperator for IdentityOp {
    fn op_type(&self) -> &str {
        "Identity"
    }

    fn execute(&self, inputs: &[&Tensor], _attributes: &Attributes) -> Result<Vec<Tensor>> {
        match inputs {
            [input] => Ok(vec![(*input).clone()]),
            _ => Err(IrError::InvalidGraph(format!(
                "Identity expects 1 input, got {}",
                inputs.len()
            ))),
        }
    }
}
