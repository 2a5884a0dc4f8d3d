//! Tensor implementation with Candle backend integration.
//!
//! This module provides the Tensor type used on both sides of a conversion
//! check: the native framework executes layers on it, and execution providers
//! run IR graphs on it.

use crate::types::DataType;
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Shape, Tensor as CandleTensor};

/// Tensor backed by a Candle tensor.
#[derive(Debug, Clone)]
pub struct Tensor {
    /// The underlying Candle tensor for computation.
    candle_tensor: CandleTensor,
    /// Element type.
    dtype: DataType,
}

impl Tensor {
    /// Create a new tensor from raw data.
    ///
    /// Values are given as `f32` and stored in `dtype`.
    ///
    /// # Example
    /// ```rust
    /// use convcheck_core::{DataType, Tensor};
    ///
    /// let data = vec![1.0, 2.0, 3.0, 4.0];
    /// let tensor = Tensor::from_data(data, vec![2, 2], DataType::F32)?;
    /// assert_eq!(tensor.to_vec()?, vec![1.0, 2.0, 3.0, 4.0]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_data(data: Vec<f32>, shape: Vec<usize>, dtype: DataType) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(anyhow!(
                "Data length {} does not match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            ));
        }

        let device = Device::Cpu;
        let candle_shape = Shape::from_dims(&shape);

        let candle_tensor = match dtype {
            DataType::F32 => CandleTensor::from_vec(data, candle_shape, &device)?,
            DataType::F16 => {
                let f16_data: Vec<half::f16> = data.into_iter().map(half::f16::from_f32).collect();
                CandleTensor::from_vec(f16_data, candle_shape, &device)?
            }
            DataType::BF16 => {
                let bf16_data: Vec<half::bf16> =
                    data.into_iter().map(half::bf16::from_f32).collect();
                CandleTensor::from_vec(bf16_data, candle_shape, &device)?
            }
            DataType::F64 => {
                let f64_data: Vec<f64> = data.into_iter().map(f64::from).collect();
                CandleTensor::from_vec(f64_data, candle_shape, &device)?
            }
            DataType::U8 => {
                let u8_data: Vec<u8> = data.into_iter().map(|x| x as u8).collect();
                CandleTensor::from_vec(u8_data, candle_shape, &device)?
            }
            DataType::U32 => {
                let u32_data: Vec<u32> = data.into_iter().map(|x| x as u32).collect();
                CandleTensor::from_vec(u32_data, candle_shape, &device)?
            }
            DataType::I64 => {
                let i64_data: Vec<i64> = data.into_iter().map(|x| x as i64).collect();
                CandleTensor::from_vec(i64_data, candle_shape, &device)?
            }
        };

        Ok(Self {
            candle_tensor,
            dtype,
        })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>, dtype: DataType) -> Result<Self> {
        let candle_tensor =
            CandleTensor::zeros(Shape::from_dims(&shape), dtype_to_candle(dtype), &Device::Cpu)?;
        Ok(Self {
            candle_tensor,
            dtype,
        })
    }

    /// Wrap a Candle tensor, deriving the data type from it.
    pub fn from_candle(candle_tensor: CandleTensor) -> Result<Self> {
        let dtype = dtype_from_candle(candle_tensor.dtype())?;
        Ok(Self {
            candle_tensor,
            dtype,
        })
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> Vec<usize> {
        self.candle_tensor.dims().to_vec()
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Get the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.candle_tensor.dims().len()
    }

    /// Get the total number of elements.
    pub fn numel(&self) -> usize {
        self.candle_tensor.elem_count()
    }

    /// Get the device where the tensor is stored.
    pub fn device(&self) -> &Device {
        self.candle_tensor.device()
    }

    /// Move the tensor to another Candle device.
    pub fn to_device(&self, device: &Device) -> Result<Self> {
        Ok(Self {
            candle_tensor: self.candle_tensor.to_device(device)?,
            dtype: self.dtype,
        })
    }

    /// Convert tensor to CPU device.
    pub fn to_cpu(&self) -> Result<Self> {
        self.to_device(&Device::Cpu)
    }

    /// Cast the tensor to another element type.
    pub fn to_dtype(&self, dtype: DataType) -> Result<Self> {
        if dtype == self.dtype {
            return Ok(self.clone());
        }
        Ok(Self {
            candle_tensor: self.candle_tensor.to_dtype(dtype_to_candle(dtype))?,
            dtype,
        })
    }

    /// Extract data as a flat, row-major vector of f32 values.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        let flattened = self.candle_tensor.to_device(&Device::Cpu)?.flatten_all()?;

        match self.dtype {
            DataType::F32 => Ok(flattened.to_vec1::<f32>()?),
            DataType::F16 => {
                let data: Vec<half::f16> = flattened.to_vec1()?;
                Ok(data.into_iter().map(|x| x.to_f32()).collect())
            }
            DataType::BF16 => {
                let data: Vec<half::bf16> = flattened.to_vec1()?;
                Ok(data.into_iter().map(|x| x.to_f32()).collect())
            }
            DataType::F64 => {
                let data: Vec<f64> = flattened.to_vec1()?;
                Ok(data.into_iter().map(|x| x as f32).collect())
            }
            DataType::U8 => {
                let data: Vec<u8> = flattened.to_vec1()?;
                Ok(data.into_iter().map(f32::from).collect())
            }
            DataType::U32 => {
                let data: Vec<u32> = flattened.to_vec1()?;
                Ok(data.into_iter().map(|x| x as f32).collect())
            }
            DataType::I64 => {
                let data: Vec<i64> = flattened.to_vec1()?;
                Ok(data.into_iter().map(|x| x as f32).collect())
            }
        }
    }

    /// Take `len` elements along `dim`, starting at `start`.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Self> {
        let shape = self.shape();
        let extent = *shape
            .get(dim)
            .ok_or_else(|| anyhow!("narrow: dimension {} out of range for {:?}", dim, shape))?;
        if start + len > extent {
            return Err(anyhow!(
                "narrow: range {}..{} exceeds dimension {} of size {}",
                start,
                start + len,
                dim,
                extent
            ));
        }

        Ok(Self {
            candle_tensor: self.candle_tensor.narrow(dim, start, len)?.contiguous()?,
            dtype: self.dtype,
        })
    }

    /// Slice several axes at once; `ranges` holds `(axis, start, end)` triples.
    ///
    /// # Example
    /// ```rust
    /// use convcheck_core::{DataType, Tensor};
    ///
    /// let data: Vec<f32> = (0..12).map(|x| x as f32).collect();
    /// let tensor = Tensor::from_data(data, vec![3, 4], DataType::F32)?;
    /// let sliced = tensor.slice_axes(&[(0, 1, 3), (1, 1, 2)])?;
    /// assert_eq!(sliced.shape(), vec![2, 1]);
    /// assert_eq!(sliced.to_vec()?, vec![5.0, 9.0]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn slice_axes(&self, ranges: &[(usize, usize, usize)]) -> Result<Self> {
        let mut result = self.clone();
        for &(axis, start, end) in ranges {
            if end < start {
                return Err(anyhow!(
                    "slice: end {} precedes start {} on axis {}",
                    end,
                    start,
                    axis
                ));
            }
            result = result.narrow(axis, start, end - start)?;
        }
        Ok(result)
    }

    /// Get the underlying Candle tensor for advanced operations.
    pub fn candle_tensor(&self) -> &CandleTensor {
        &self.candle_tensor
    }
}

/// Map a convcheck data type to the Candle equivalent.
pub fn dtype_to_candle(dtype: DataType) -> DType {
    match dtype {
        DataType::F32 => DType::F32,
        DataType::F16 => DType::F16,
        DataType::BF16 => DType::BF16,
        DataType::F64 => DType::F64,
        DataType::U8 => DType::U8,
        DataType::U32 => DType::U32,
        DataType::I64 => DType::I64,
    }
}

/// Map a Candle data type back to a convcheck data type.
pub fn dtype_from_candle(dtype: DType) -> Result<DataType> {
    match dtype {
        DType::F32 => Ok(DataType::F32),
        DType::F16 => Ok(DataType::F16),
        DType::BF16 => Ok(DataType::BF16),
        DType::F64 => Ok(DataType::F64),
        DType::U8 => Ok(DataType::U8),
        DType::U32 => Ok(DataType::U32),
        DType::I64 => Ok(DataType::I64),
        #[allow(unreachable_patterns)]
        other => Err(anyhow!("Unsupported Candle dtype: {:?}", other)),
    }
}
