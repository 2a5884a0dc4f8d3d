//! Lowering of native models into IR graphs.

use crate::artifact::{write_artifact, ConvertedModel, IrArtifact};
use crate::error::{IrError, Result};
use crate::ops::OperatorRegistry;
use crate::version::IrVersion;
use convcheck_core::{GraphNode, ModelGraph, NodeAttribute, TensorInfo};
use convcheck_keras::{LayerNode, LayerSpec, Model};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Value recorded in the `producer` field of artifacts.
pub const PRODUCER_NAME: &str = "convcheck-ir";

/// Settings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Target format version.
    pub ir_version: IrVersion,
    /// Static batch-inclusive shapes for the model inputs, in input order.
    /// Without them the batch dimension is left dynamic (recorded as 0).
    pub input_shapes: Option<Vec<Vec<usize>>>,
}

impl ConversionOptions {
    /// Options targeting `ir_version` with a dynamic batch.
    pub fn new(ir_version: IrVersion) -> Self {
        Self {
            ir_version,
            input_shapes: None,
        }
    }

    /// Freeze input shapes.
    pub fn with_input_shapes(mut self, shapes: Vec<Vec<usize>>) -> Self {
        self.input_shapes = Some(shapes);
        self
    }
}

/// Turns a native model into an IR artifact.
pub trait ModelConverter: Send + Sync {
    /// Converter name for diagnostics.
    fn name(&self) -> &str;

    /// Convert `model`, writing the artifact under `out_dir`.
    fn convert(
        &self,
        model: &Model,
        options: &ConversionOptions,
        out_dir: &Path,
    ) -> Result<ConvertedModel>;
}

/// The built-in converter.
#[derive(Debug, Clone, Default)]
pub struct IrConverter {
    registry: OperatorRegistry,
}

impl IrConverter {
    /// Converter accepting the built-in operator set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter validating emitted nodes against `registry`.
    pub fn with_registry(registry: OperatorRegistry) -> Self {
        Self { registry }
    }

    /// Lower `model` to an in-memory graph without writing anything.
    pub fn lower(&self, model: &Model, options: &ConversionOptions) -> Result<ModelGraph> {
        let mut graph = ModelGraph::new();
        // Batch size of every known tensor; 0 is a dynamic batch.
        let mut batch: HashMap<String, usize> = HashMap::new();

        let overrides = options.input_shapes.as_deref();
        if let Some(shapes) = overrides {
            if shapes.len() != model.inputs().len() {
                return Err(IrError::InvalidInputShape(format!(
                    "model '{}' has {} inputs, {} shapes given",
                    model.name(),
                    model.inputs().len(),
                    shapes.len()
                )));
            }
        }

        for (index, input) in model.inputs().iter().enumerate() {
            let shape = match overrides.map(|shapes| &shapes[index]) {
                Some(shape) => {
                    if shape.len() != input.shape.len() + 1 || shape[1..] != input.shape[..] {
                        return Err(IrError::InvalidInputShape(format!(
                            "input '{}' is (batch, {:?}), override is {:?}",
                            input.name, input.shape, shape
                        )));
                    }
                    shape.clone()
                }
                None => std::iter::once(0).chain(input.shape.iter().copied()).collect(),
            };
            batch.insert(input.name.clone(), shape[0]);
            graph.inputs.push(TensorInfo {
                name: input.name.clone(),
                shape,
                data_type: input.dtype,
            });
        }

        for layer in model.layers() {
            let node = self.lower_layer(layer)?;
            let op = self.registry.get(&node.op_type)?;
            op.validate(&node.attributes)?;
            let layer_batch = batch.get(&layer.input).copied().unwrap_or(0);
            batch.insert(layer.output.clone(), layer_batch);
            debug!(layer = %layer.name, op = %node.op_type, "layer lowered");
            graph.add_node(node);
        }

        for output in model.outputs() {
            let leading = batch.get(&output.name).copied().unwrap_or(0);
            graph.outputs.push(TensorInfo {
                name: output.name.clone(),
                shape: std::iter::once(leading)
                    .chain(output.shape.iter().copied())
                    .collect(),
                data_type: output.dtype,
            });
        }

        graph
            .metadata
            .insert("producer".to_string(), PRODUCER_NAME.to_string());
        graph
            .metadata
            .insert("source_model".to_string(), model.name().to_string());
        graph
            .metadata
            .insert("ir_version".to_string(), options.ir_version.to_string());

        graph
            .connect_by_tensor_names()
            .and_then(|_| graph.validate())
            .map_err(|err| IrError::InvalidGraph(err.to_string()))?;
        Ok(graph)
    }

    fn lower_layer(&self, layer: &LayerNode) -> Result<GraphNode> {
        match &layer.spec {
            LayerSpec::Cropping {
                cropping,
                data_format,
            } => {
                let axes = data_format.spatial_axes(cropping.len());
                let starts: Vec<i64> = cropping.iter().map(|&(begin, _)| begin as i64).collect();
                // Ends are stored relative to the end of each axis so the node
                // does not depend on the batch or spatial extents.
                let ends: Vec<i64> = cropping
                    .iter()
                    .map(|&(_, end)| if end == 0 { i64::MAX } else { -(end as i64) })
                    .collect();

                let mut attributes = BTreeMap::new();
                attributes.insert("starts".to_string(), NodeAttribute::IntArray(starts));
                attributes.insert("ends".to_string(), NodeAttribute::IntArray(ends));
                attributes.insert(
                    "axes".to_string(),
                    NodeAttribute::IntArray(axes.into_iter().map(|a| a as i64).collect()),
                );

                Ok(GraphNode {
                    id: 0,
                    op_type: "Slice".to_string(),
                    name: Some(layer.name.clone()),
                    inputs: vec![layer.input.clone()],
                    outputs: vec![layer.output.clone()],
                    attributes,
                })
            }
            other => Err(IrError::UnsupportedLayer {
                layer: layer.name.clone(),
                class_name: other.class_name().to_string(),
            }),
        }
    }
}

impl ModelConverter for IrConverter {
    fn name(&self) -> &str {
        PRODUCER_NAME
    }

    #[instrument(skip(self, model, options), fields(model = %model.name(), ir_version = %options.ir_version))]
    fn convert(
        &self,
        model: &Model,
        options: &ConversionOptions,
        out_dir: &Path,
    ) -> Result<ConvertedModel> {
        let graph = self.lower(model, options)?;
        let artifact = IrArtifact {
            ir_version: options.ir_version,
            producer: PRODUCER_NAME.to_string(),
            graph,
        };
        let artifact_path = write_artifact(&artifact, out_dir, model.name())?;

        info!(
            nodes = artifact.graph.node_count(),
            path = %artifact_path.display(),
            "model converted"
        );
        Ok(ConvertedModel {
            graph: artifact.graph,
            ir_version: artifact.ir_version,
            artifact_path,
        })
    }
}
