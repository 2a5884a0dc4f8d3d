//! Tolerance-based comparison of native and converted outputs.

use crate::error::{HarnessError, Result};
use convcheck_core::{Precision, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Elementwise tolerance: `|actual - expected| <= atol + rtol * |expected|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Absolute term.
    pub atol: f32,
    /// Relative term, scaled by the expected value.
    pub rtol: f32,
}

impl Tolerance {
    /// Tolerance for FP32 execution.
    pub const FP32: Tolerance = Tolerance {
        atol: 1e-4,
        rtol: 1e-4,
    };

    /// Tolerance for FP16 execution.
    pub const FP16: Tolerance = Tolerance {
        atol: 5e-2,
        rtol: 5e-2,
    };

    /// Create a tolerance.
    pub fn new(atol: f32, rtol: f32) -> Self {
        Self { atol, rtol }
    }

    /// Default tolerance for `precision`.
    pub fn for_precision(precision: Precision) -> Self {
        match precision {
            Precision::FP32 => Self::FP32,
            Precision::FP16 => Self::FP16,
        }
    }

    /// Whether `actual` is close enough to `expected`.
    ///
    /// NaN only matches NaN; equal infinities match.
    pub fn allows(&self, expected: f32, actual: f32) -> bool {
        if expected.is_nan() || actual.is_nan() {
            return expected.is_nan() && actual.is_nan();
        }
        if expected == actual {
            return true;
        }
        if expected.is_infinite() || actual.is_infinite() {
            return false;
        }
        (actual - expected).abs() <= self.atol + self.rtol * expected.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::FP32
    }
}

/// Deviation statistics of one flat buffer pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDiff {
    /// Flat index of the offending element with the largest absolute
    /// deviation; 0 when nothing offends.
    pub worst_index: usize,
    /// Largest absolute deviation over all elements; infinite when NaN is
    /// involved.
    pub max_abs: f32,
    /// Largest relative deviation over elements with `|expected| > atol`.
    pub max_rel: f32,
    /// Number of elements outside tolerance.
    pub offending: usize,
}

/// Compare two flat buffers of equal length.
pub fn compare_values(expected: &[f32], actual: &[f32], tolerance: Tolerance) -> ValueDiff {
    let mut diff = ValueDiff {
        worst_index: 0,
        max_abs: 0.0,
        max_rel: 0.0,
        offending: 0,
    };

    // Absolute deviation of the current worst offender.
    let mut worst_abs = f32::NEG_INFINITY;

    for (index, (&e, &a)) in expected.iter().zip(actual).enumerate() {
        let offends = !tolerance.allows(e, a);
        let abs = if e.is_nan() || a.is_nan() {
            if e.is_nan() && a.is_nan() {
                0.0
            } else {
                f32::INFINITY
            }
        } else if e == a {
            0.0
        } else {
            (a - e).abs()
        };
        if offends {
            diff.offending += 1;
            if abs > worst_abs {
                worst_abs = abs;
                diff.worst_index = index;
            }
        }
        diff.max_abs = diff.max_abs.max(abs);
        // Near zero the ratio says nothing; the absolute term governs there.
        if e.abs() > tolerance.atol {
            diff.max_rel = diff.max_rel.max(abs / e.abs());
        }
    }

    diff
}

/// Diagnostic for an output that failed the value comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchReport {
    /// Position of the output in the model's output list.
    pub output_index: usize,
    /// Output tensor name.
    pub output_name: String,
    /// Coordinate of the offending element with the largest absolute
    /// deviation.
    pub coordinate: Vec<usize>,
    /// Native value at `coordinate`.
    pub expected: f32,
    /// Converted value at `coordinate`.
    pub actual: f32,
    /// Largest absolute deviation over the whole output.
    pub max_abs: f32,
    /// Largest relative deviation where `|expected| > atol`.
    pub max_rel: f32,
    /// Elements outside tolerance.
    pub offending: usize,
    /// Elements compared.
    pub total: usize,
    /// Tolerance applied.
    pub tolerance: Tolerance,
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "output {} ('{}'): {} of {} elements outside atol={} rtol={}; \
             worst offender at {:?}: expected {}, got {} (max abs {}, max rel {})",
            self.output_index,
            self.output_name,
            self.offending,
            self.total,
            self.tolerance.atol,
            self.tolerance.rtol,
            self.coordinate,
            self.expected,
            self.actual,
            self.max_abs,
            self.max_rel
        )
    }
}

/// What a passing comparison looked at.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSummary {
    /// Outputs compared.
    pub outputs: usize,
    /// Elements compared across all outputs.
    pub elements: usize,
    /// Largest absolute deviation seen.
    pub max_abs: f32,
}

/// Compare native outputs against converted outputs.
///
/// `names` labels the outputs in reports. The first failing output is
/// reported.
pub fn compare_outputs(
    expected: &[Tensor],
    actual: &[Tensor],
    names: &[String],
    tolerance: Tolerance,
) -> Result<ComparisonSummary> {
    if expected.len() != actual.len() {
        return Err(HarnessError::ShapeMismatch(format!(
            "native model produced {} outputs, converted model {}",
            expected.len(),
            actual.len()
        )));
    }

    let mut summary = ComparisonSummary {
        outputs: expected.len(),
        elements: 0,
        max_abs: 0.0,
    };

    for (output_index, (e, a)) in expected.iter().zip(actual).enumerate() {
        let name = names
            .get(output_index)
            .cloned()
            .unwrap_or_else(|| format!("output_{}", output_index));
        let shape = e.shape();
        if shape != a.shape() {
            return Err(HarnessError::ShapeMismatch(format!(
                "output {} ('{}'): native shape {:?}, converted shape {:?}",
                output_index,
                name,
                shape,
                a.shape()
            )));
        }

        let read = |t: &Tensor| {
            t.to_vec().map_err(|source| {
                HarnessError::ShapeMismatch(format!(
                    "output {} ('{}') cannot be read: {}",
                    output_index, name, source
                ))
            })
        };
        let expected_values = read(e)?;
        let actual_values = read(a)?;
        let diff = compare_values(&expected_values, &actual_values, tolerance);

        if diff.offending > 0 {
            return Err(HarnessError::Mismatch(MismatchReport {
                output_index,
                output_name: name,
                coordinate: unravel(diff.worst_index, &shape),
                expected: expected_values[diff.worst_index],
                actual: actual_values[diff.worst_index],
                max_abs: diff.max_abs,
                max_rel: diff.max_rel,
                offending: diff.offending,
                total: expected_values.len(),
                tolerance,
            }));
        }

        summary.elements += expected_values.len();
        summary.max_abs = summary.max_abs.max(diff.max_abs);
    }

    Ok(summary)
}

/// Row-major flat index to coordinate.
pub fn unravel(mut index: usize, shape: &[usize]) -> Vec<usize> {
    let mut coordinate = vec![0; shape.len()];
    for (axis, &extent) in shape.iter().enumerate().rev() {
        if extent > 0 {
            coordinate[axis] = index % extent;
            index /= extent;
        }
    }
    coordinate
}
