//! Deterministic input generation.

use crate::params::InputSpec;
use anyhow::Result;
use convcheck_core::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Generated values are integers in this range, exact at FP16.
pub const VALUE_RANGE: Range<i32> = -255..255;

/// Generate one tensor per input from a single seeded stream.
///
/// The same specs and seed always yield the same tensors.
pub fn generate_inputs(specs: &[InputSpec], seed: u64) -> Result<Vec<Tensor>> {
    let mut rng = StdRng::seed_from_u64(seed);
    specs
        .iter()
        .map(|spec| {
            let numel: usize = spec.shape.iter().product();
            let data: Vec<f32> = (0..numel)
                .map(|_| rng.gen_range(VALUE_RANGE) as f32)
                .collect();
            Tensor::from_data(data, spec.shape.clone(), spec.dtype)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use convcheck_core::DataType;

    fn spec(shape: Vec<usize>) -> InputSpec {
        InputSpec {
            name: "x".to_string(),
            shape,
            dtype: DataType::F32,
        }
    }

    #[test]
    fn test_same_seed_same_values() {
        let specs = [spec(vec![3, 5, 7, 5]), spec(vec![2, 2])];
        let a = generate_inputs(&specs, 0).unwrap();
        let b = generate_inputs(&specs, 0).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.to_vec().unwrap(), y.to_vec().unwrap());
        }
        let c = generate_inputs(&specs, 1).unwrap();
        assert_ne!(a[0].to_vec().unwrap(), c[0].to_vec().unwrap());
    }

    #[test]
    fn test_values_are_integers_in_range() {
        let tensors = generate_inputs(&[spec(vec![4, 64])], 9).unwrap();
        assert_eq!(tensors[0].shape(), vec![4, 64]);
        for value in tensors[0].to_vec().unwrap() {
            assert_eq!(value.fract(), 0.0);
            assert!((-255.0..255.0).contains(&value));
        }
    }

    #[test]
    fn test_fp16_inputs_are_exact() {
        let f16_spec = InputSpec {
            dtype: DataType::F16,
            ..spec(vec![16, 16])
        };
        let half = generate_inputs(&[f16_spec], 3).unwrap();
        let full = generate_inputs(&[spec(vec![16, 16])], 3).unwrap();
        assert_eq!(half[0].dtype(), DataType::F16);
        assert_eq!(half[0].to_vec().unwrap(), full[0].to_vec().unwrap());
    }
}
