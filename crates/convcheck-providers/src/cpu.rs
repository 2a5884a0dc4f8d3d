//! CPU execution provider.

use crate::executor::GraphExecutor;
use crate::provider::ExecutionProvider;
use crate::Result;
use candle_core::Device;
use convcheck_core::{DeviceKind, ModelGraph, Precision, Tensor};
use convcheck_ir::OperatorRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for the CPU execution provider.
#[derive(Debug, Clone, Default)]
pub struct CpuProviderConfig {
    /// Compute precision.
    pub precision: Precision,
    /// Operator set; `None` uses the built-in operators.
    pub operators: Option<OperatorRegistry>,
}

/// Executes IR graphs on the host CPU.
#[derive(Debug)]
pub struct CpuExecutionProvider {
    executor: GraphExecutor,
}

impl CpuExecutionProvider {
    /// Create a CPU provider computing at `precision`.
    pub fn new(precision: Precision) -> Result<Self> {
        Self::with_config(CpuProviderConfig {
            precision,
            ..CpuProviderConfig::default()
        })
    }

    /// Create a CPU provider with custom configuration.
    pub fn with_config(config: CpuProviderConfig) -> Result<Self> {
        let registry = config.operators.unwrap_or_default();
        info!(
            precision = %config.precision,
            operators = ?registry.supported_operators(),
            "created CPU provider"
        );
        Ok(Self {
            executor: GraphExecutor::with_registry(Device::Cpu, config.precision, registry),
        })
    }
}

impl ExecutionProvider for CpuExecutionProvider {
    fn device(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn precision(&self) -> Precision {
        self.executor.precision()
    }

    fn supports(&self, op_type: &str) -> bool {
        self.executor.registry().is_supported(op_type)
    }

    fn execute(&self, graph: &ModelGraph, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        debug!(nodes = graph.node_count(), "executing graph on CPU");
        self.executor.run(graph, inputs)
    }
}

/// Create a shared CPU provider computing at `precision`.
pub fn create_cpu_provider(precision: Precision) -> Result<Arc<dyn ExecutionProvider>> {
    Ok(Arc::new(CpuExecutionProvider::new(precision)?))
}
