//! Node-by-node graph execution shared by all providers.

use crate::Result;
use anyhow::{anyhow, Context};
use candle_core::Device;
use convcheck_core::{DataType, ModelGraph, Precision, Tensor, TensorInfo};
use convcheck_ir::OperatorRegistry;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace};

/// Walks a graph in topological order, resolving each node through an
/// [`OperatorRegistry`].
#[derive(Debug, Clone)]
pub struct GraphExecutor {
    device: Device,
    precision: Precision,
    registry: OperatorRegistry,
}

impl GraphExecutor {
    /// Executor with the built-in operator set.
    pub fn new(device: Device, precision: Precision) -> Self {
        Self::with_registry(device, precision, OperatorRegistry::new())
    }

    /// Executor resolving operators through `registry`.
    pub fn with_registry(device: Device, precision: Precision, registry: OperatorRegistry) -> Self {
        Self {
            device,
            precision,
            registry,
        }
    }

    /// Candle device tensors are placed on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Compute precision.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Operators this executor can run.
    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Execute `graph` on `inputs`, returning F32 CPU tensors.
    pub fn run(&self, graph: &ModelGraph, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let start = Instant::now();
        if inputs.len() != graph.inputs.len() {
            return Err(anyhow!(
                "Graph expects {} inputs, got {}",
                graph.inputs.len(),
                inputs.len()
            ));
        }

        let compute_type = self.precision.data_type();
        let mut values: HashMap<&str, Tensor> = HashMap::new();
        for (info, tensor) in graph.inputs.iter().zip(inputs) {
            check_shape(info, &tensor.shape())?;
            let placed = tensor.to_dtype(compute_type)?.to_device(&self.device)?;
            values.insert(info.name.as_str(), placed);
        }

        let order = graph.topological_sort()?;
        for node_id in order {
            let node = graph
                .get_node(node_id)
                .ok_or_else(|| anyhow!("Node {} missing from graph", node_id))?;
            let op = self.registry.get(&node.op_type)?;

            let node_inputs = node
                .inputs
                .iter()
                .map(|name| {
                    values
                        .get(name.as_str())
                        .ok_or_else(|| anyhow!("Tensor '{}' is not available", name))
                })
                .collect::<Result<Vec<_>>>()?;

            let results = op
                .execute(&node_inputs, &node.attributes)
                .with_context(|| format!("{} node {:?} failed", node.op_type, node.name))?;
            if results.len() != node.outputs.len() {
                return Err(anyhow!(
                    "{} produced {} outputs, node declares {}",
                    node.op_type,
                    results.len(),
                    node.outputs.len()
                ));
            }

            trace!(op = %node.op_type, node = ?node.name, "node executed");
            for (name, tensor) in node.outputs.iter().zip(results) {
                values.insert(name.as_str(), tensor);
            }
        }

        let outputs = graph
            .outputs
            .iter()
            .map(|info| {
                let tensor = values
                    .get(info.name.as_str())
                    .ok_or_else(|| anyhow!("Graph output '{}' was never produced", info.name))?;
                check_shape(info, &tensor.shape())?;
                tensor.to_cpu()?.to_dtype(DataType::F32)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            nodes = graph.node_count(),
            precision = %self.precision,
            elapsed_us = start.elapsed().as_micros() as u64,
            "graph executed"
        );
        Ok(outputs)
    }
}

/// A declared extent of 0 is dynamic and matches any size.
fn check_shape(info: &TensorInfo, actual: &[usize]) -> Result<()> {
    let matches = info.shape.len() == actual.len()
        && info
            .shape
            .iter()
            .zip(actual)
            .all(|(&declared, &actual)| declared == 0 || declared == actual);
    if matches {
        Ok(())
    } else {
        Err(anyhow!(
            "Tensor '{}' has shape {:?}, graph declares {:?}",
            info.name,
            actual,
            info.shape
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convcheck_core::{GraphNode, NodeAttribute};
    use std::collections::BTreeMap;

    fn slice_graph(input_shape: Vec<usize>, output_shape: Vec<usize>) -> ModelGraph {
        let mut attributes = BTreeMap::new();
        attributes.insert("starts".to_string(), NodeAttribute::IntArray(vec![1]));
        attributes.insert("ends".to_string(), NodeAttribute::IntArray(vec![-1]));
        attributes.insert("axes".to_string(), NodeAttribute::IntArray(vec![1]));

        let mut graph = ModelGraph::new();
        graph.add_node(GraphNode {
            id: 0,
            op_type: "Slice".to_string(),
            name: Some("crop".to_string()),
            inputs: vec!["x".to_string()],
            outputs: vec!["y".to_string()],
            attributes,
        });
        graph.inputs.push(TensorInfo {
            name: "x".to_string(),
            shape: input_shape,
            data_type: DataType::F32,
        });
        graph.outputs.push(TensorInfo {
            name: "y".to_string(),
            shape: output_shape,
            data_type: DataType::F32,
        });
        graph
    }

    #[test]
    fn test_dynamic_batch_accepts_any_size() {
        let graph = slice_graph(vec![0, 4], vec![0, 2]);
        let executor = GraphExecutor::new(Device::Cpu, Precision::FP32);
        for batch in [1, 3] {
            let data: Vec<f32> = (0..batch * 4).map(|x| x as f32).collect();
            let input = Tensor::from_data(data, vec![batch, 4], DataType::F32).unwrap();
            let outputs = executor.run(&graph, &[input]).unwrap();
            assert_eq!(outputs[0].shape(), vec![batch, 2]);
        }
    }

    #[test]
    fn test_static_shape_mismatch_rejected() {
        let graph = slice_graph(vec![2, 4], vec![2, 2]);
        let executor = GraphExecutor::new(Device::Cpu, Precision::FP32);
        let input = Tensor::zeros(vec![2, 5], DataType::F32).unwrap();
        assert!(executor.run(&graph, &[input]).is_err());
    }

    #[test]
    fn test_fp16_outputs_come_back_as_f32() {
        let graph = slice_graph(vec![0, 4], vec![0, 2]);
        let executor = GraphExecutor::new(Device::Cpu, Precision::FP16);
        let input =
            Tensor::from_data(vec![-3.0, 7.0, 250.0, 1.0], vec![1, 4], DataType::F32).unwrap();
        let outputs = executor.run(&graph, &[input]).unwrap();
        assert_eq!(outputs[0].dtype(), DataType::F32);
        assert_eq!(outputs[0].to_vec().unwrap(), vec![7.0, 250.0]);
    }

    #[test]
    fn test_unknown_operator_fails() {
        let graph = slice_graph(vec![0, 4], vec![0, 2]);
        let executor =
            GraphExecutor::with_registry(Device::Cpu, Precision::FP32, OperatorRegistry::empty());
        let input = Tensor::zeros(vec![1, 4], DataType::F32).unwrap();
        let err = executor.run(&graph, &[input]).unwrap_err();
        assert!(err.to_string().contains("Unsupported operator"));
    }
}
