//! convcheck core types
//!
//! This crate provides the foundational pieces shared by every convcheck crate:
//! the candle-backed [`Tensor`], data type and target selectors, the IR graph
//! representation produced by converters, and structured logging setup.
//!
//! ## Architecture
//!
//! - **Types**: data types, devices, precisions and IR graph structures
//! - **Tensor**: multi-dimensional arrays on top of Candle
//! - **Graph**: validation and traversal utilities for [`ModelGraph`]
//! - **Logging**: `tracing` subscriber configuration
//!
//! ## Example
//!
//! ```rust
//! use convcheck_core::{DataType, Tensor};
//!
//! let tensor = Tensor::zeros(vec![2, 3], DataType::F32)?;
//! assert_eq!(tensor.shape(), vec![2, 3]);
//! assert_eq!(tensor.numel(), 6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Error types for core operations
pub mod error;
pub mod graph;
pub mod logging;
pub mod tensor;
pub mod types;

pub use error::{CoreError, Result};
pub use graph::GraphStatistics;
pub use tensor::Tensor;
pub use types::{
    DataType, DeviceKind, GraphEdge, GraphNode, ModelGraph, NodeAttribute, NodeId, Precision,
    TensorInfo,
};
