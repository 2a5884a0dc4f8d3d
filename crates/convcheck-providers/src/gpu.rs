//! GPU execution provider on a Candle CUDA device.
//!
//! The provider is only constructible when the crate is built with the `gpu`
//! feature and a CUDA device can be opened.

use crate::executor::GraphExecutor;
use crate::provider::ExecutionProvider;
use crate::Result;
use anyhow::anyhow;
use convcheck_core::{DeviceKind, ModelGraph, Precision, Tensor};
use std::sync::Arc;
use tracing::debug;

/// Configuration for the GPU execution provider.
#[derive(Debug, Clone, Default)]
pub struct GpuProviderConfig {
    /// CUDA device ordinal.
    pub device_id: usize,
    /// Compute precision.
    pub precision: Precision,
}

/// Executes IR graphs on a CUDA device.
#[derive(Debug)]
pub struct GpuExecutionProvider {
    config: GpuProviderConfig,
    executor: GraphExecutor,
}

impl GpuExecutionProvider {
    /// Create a GPU provider on device 0 computing at `precision`.
    pub fn new(precision: Precision) -> Result<Self> {
        Self::with_config(GpuProviderConfig {
            device_id: 0,
            precision,
        })
    }

    /// Create a GPU provider with custom configuration.
    #[cfg(feature = "gpu")]
    pub fn with_config(config: GpuProviderConfig) -> Result<Self> {
        let device = candle_core::Device::new_cuda(config.device_id).map_err(|e| {
            anyhow!(
                "GPU not available: cannot open CUDA device {}: {}",
                config.device_id,
                e
            )
        })?;
        tracing::info!(
            device_id = config.device_id,
            precision = %config.precision,
            "created GPU provider"
        );
        Ok(Self {
            executor: GraphExecutor::new(device, config.precision),
            config,
        })
    }

    /// Fallback constructor when GPU support is not compiled in.
    #[cfg(not(feature = "gpu"))]
    pub fn with_config(config: GpuProviderConfig) -> Result<Self> {
        Err(anyhow!(
            "GPU not available: device {} requested but GPU support is not compiled in",
            config.device_id
        ))
    }

    /// Provider configuration.
    pub fn config(&self) -> &GpuProviderConfig {
        &self.config
    }
}

impl ExecutionProvider for GpuExecutionProvider {
    fn device(&self) -> DeviceKind {
        DeviceKind::Gpu
    }

    fn precision(&self) -> Precision {
        self.executor.precision()
    }

    fn supports(&self, op_type: &str) -> bool {
        self.executor.registry().is_supported(op_type)
    }

    fn execute(&self, graph: &ModelGraph, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        debug!(
            nodes = graph.node_count(),
            device_id = self.config.device_id,
            "executing graph on GPU"
        );
        self.executor.run(graph, inputs)
    }
}

/// Create a shared GPU provider computing at `precision`.
pub fn create_gpu_provider(precision: Precision) -> Result<Arc<dyn ExecutionProvider>> {
    Ok(Arc::new(GpuExecutionProvider::new(precision)?))
}
