//! Execution providers for convcheck IR graphs
//!
//! A provider runs a [`ModelGraph`](convcheck_core::ModelGraph) produced by the
//! converter on one device at one precision:
//! - **CPU**: always available
//! - **GPU**: a CUDA device through Candle, compiled in with the `gpu` feature
//! - **Registry**: one cached provider per device and precision
//!
//! ## Example
//!
//! ```rust
//! use convcheck_core::{DeviceKind, Precision};
//! use convcheck_providers::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! let cpu = registry.get_or_create(DeviceKind::Cpu, Precision::FP32)?;
//! assert_eq!(cpu.device(), DeviceKind::Cpu);
//!
//! // Without a CUDA build the GPU provider cannot be created.
//! if let Err(e) = registry.get_or_create(DeviceKind::Gpu, Precision::FP32) {
//!     println!("GPU not available: {}", e);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod cpu;
pub mod executor;
pub mod gpu;
pub mod provider;
pub mod registry;

pub use cpu::{create_cpu_provider, CpuExecutionProvider, CpuProviderConfig};
pub use executor::GraphExecutor;
pub use gpu::{create_gpu_provider, GpuExecutionProvider, GpuProviderConfig};
pub use provider::ExecutionProvider;
pub use registry::{ProviderRegistry, RegistryStatistics};

use convcheck_core::{DeviceKind, Precision};
use std::sync::Arc;

/// Result type alias for provider operations.
pub type Result<T> = anyhow::Result<T>;

/// Create a provider for `device` at `precision`.
pub fn create_provider(
    device: DeviceKind,
    precision: Precision,
) -> Result<Arc<dyn ExecutionProvider>> {
    match device {
        DeviceKind::Cpu => create_cpu_provider(precision),
        DeviceKind::Gpu => create_gpu_provider(precision),
    }
}
