//! Layers available to native models.
//!
//! The cropping family trims leading and trailing elements from each spatial
//! axis. `Lambda` wraps an arbitrary elementwise function; it runs natively but
//! has no IR lowering.

use crate::error::{FrameworkError, Result};
use crate::session::{FrameworkSession, SymbolicTensor};
use convcheck_core::Tensor;
use std::fmt;
use std::sync::Arc;

/// Position of the channel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// `(batch, spatial..., channels)`
    #[default]
    ChannelsLast,
    /// `(batch, channels, spatial...)`
    ChannelsFirst,
}

impl DataFormat {
    /// Batch-inclusive axes holding the `rank` spatial dimensions.
    pub fn spatial_axes(self, rank: usize) -> Vec<usize> {
        match self {
            DataFormat::ChannelsLast => (1..=rank).collect(),
            DataFormat::ChannelsFirst => (2..=rank + 1).collect(),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::ChannelsLast => f.write_str("channels_last"),
            DataFormat::ChannelsFirst => f.write_str("channels_first"),
        }
    }
}

/// Cropping argument for an `R`-dimensional cropping layer.
///
/// Mirrors the accepted argument forms: one integer for every side, one
/// integer per axis applied to both ends, or explicit `(begin, end)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cropping<const R: usize> {
    /// Same amount at both ends of every spatial axis.
    Uniform(usize),
    /// Per-axis amount applied at both ends.
    Symmetric([usize; R]),
    /// Per-axis `(begin, end)` amounts.
    Explicit([(usize, usize); R]),
}

impl<const R: usize> Cropping<R> {
    /// Per-axis `(begin, end)` amounts.
    pub fn resolve(self) -> [(usize, usize); R] {
        match self {
            Cropping::Uniform(n) => [(n, n); R],
            Cropping::Symmetric(amounts) => amounts.map(|n| (n, n)),
            Cropping::Explicit(pairs) => pairs,
        }
    }
}

impl<const R: usize> From<usize> for Cropping<R> {
    fn from(n: usize) -> Self {
        Cropping::Uniform(n)
    }
}

impl<const R: usize> From<[(usize, usize); R]> for Cropping<R> {
    fn from(pairs: [(usize, usize); R]) -> Self {
        Cropping::Explicit(pairs)
    }
}

/// A 1D crop is given as `(begin, end)`.
impl From<(usize, usize)> for Cropping<1> {
    fn from((begin, end): (usize, usize)) -> Self {
        Cropping::Explicit([(begin, end)])
    }
}

/// A 2D crop tuple is `(height, width)`, symmetric on each axis.
impl From<(usize, usize)> for Cropping<2> {
    fn from((height, width): (usize, usize)) -> Self {
        Cropping::Symmetric([height, width])
    }
}

impl From<((usize, usize), (usize, usize))> for Cropping<2> {
    fn from((height, width): ((usize, usize), (usize, usize))) -> Self {
        Cropping::Explicit([height, width])
    }
}

impl From<(usize, usize, usize)> for Cropping<3> {
    fn from((d1, d2, d3): (usize, usize, usize)) -> Self {
        Cropping::Symmetric([d1, d2, d3])
    }
}

impl From<((usize, usize), (usize, usize), (usize, usize))> for Cropping<3> {
    fn from((d1, d2, d3): ((usize, usize), (usize, usize), (usize, usize))) -> Self {
        Cropping::Explicit([d1, d2, d3])
    }
}

/// Elementwise function carried by a [`Lambda`] layer.
pub type LambdaFn = Arc<dyn Fn(&Tensor) -> anyhow::Result<Tensor> + Send + Sync>;

/// Configuration of a registered layer.
#[derive(Clone)]
pub enum LayerSpec {
    /// Cropping over `cropping.len()` spatial axes.
    Cropping {
        /// Per spatial axis `(begin, end)`.
        cropping: Vec<(usize, usize)>,
        /// Channel axis placement.
        data_format: DataFormat,
    },
    /// Arbitrary shape-preserving function.
    Lambda {
        /// The function applied to the layer input.
        function: LambdaFn,
    },
}

impl LayerSpec {
    /// Framework class name of the layer.
    pub fn class_name(&self) -> &'static str {
        match self {
            LayerSpec::Cropping { cropping, .. } => match cropping.len() {
                1 => "Cropping1D",
                2 => "Cropping2D",
                _ => "Cropping3D",
            },
            LayerSpec::Lambda { .. } => "Lambda",
        }
    }

    /// Infer the output shape (batch excluded) for an input of `input_shape`.
    pub fn output_shape(&self, layer: &str, input_shape: &[usize]) -> Result<Vec<usize>> {
        match self {
            LayerSpec::Cropping {
                cropping,
                data_format,
            } => {
                let rank = cropping.len();
                if input_shape.len() != rank + 1 {
                    return Err(FrameworkError::Shape(format!(
                        "{} '{}' expects an input of rank {} (batch excluded), got {:?}",
                        self.class_name(),
                        layer,
                        rank + 1,
                        input_shape
                    )));
                }

                let mut shape = input_shape.to_vec();
                for (index, axis) in data_format.spatial_axes(rank).into_iter().enumerate() {
                    let (begin, end) = cropping[index];
                    let dim = shape[axis - 1];
                    if crops_away(dim, begin, end) {
                        return Err(FrameworkError::InvalidCropping {
                            layer: layer.to_string(),
                            reason: format!(
                                "cropping ({}, {}) on spatial axis {} leaves nothing of size {}",
                                begin, end, index, dim
                            ),
                        });
                    }
                    shape[axis - 1] = dim - begin - end;
                }
                Ok(shape)
            }
            LayerSpec::Lambda { .. } => Ok(input_shape.to_vec()),
        }
    }

    /// Run the layer on a concrete, batch-inclusive tensor.
    pub(crate) fn execute(&self, layer: &str, input: &Tensor) -> Result<Tensor> {
        match self {
            LayerSpec::Cropping {
                cropping,
                data_format,
            } => {
                let shape = input.shape();
                let mut ranges = Vec::with_capacity(cropping.len());
                for (&axis, &(begin, end)) in data_format
                    .spatial_axes(cropping.len())
                    .iter()
                    .zip(cropping.iter())
                {
                    let dim = *shape.get(axis).ok_or_else(|| {
                        FrameworkError::Shape(format!(
                            "'{}' received rank-{} input, axis {} missing",
                            layer,
                            shape.len(),
                            axis
                        ))
                    })?;
                    if crops_away(dim, begin, end) {
                        return Err(FrameworkError::Shape(format!(
                            "'{}' cannot crop ({}, {}) from axis {} of size {}",
                            layer, begin, end, axis, dim
                        )));
                    }
                    ranges.push((axis, begin, dim - end));
                }
                Ok(input.slice_axes(&ranges)?)
            }
            LayerSpec::Lambda { function } => {
                let output = function(input)?;
                if output.shape() != input.shape() {
                    return Err(FrameworkError::Shape(format!(
                        "Lambda '{}' changed shape {:?} -> {:?}",
                        layer,
                        input.shape(),
                        output.shape()
                    )));
                }
                Ok(output)
            }
        }
    }
}

impl fmt::Debug for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSpec::Cropping {
                cropping,
                data_format,
            } => f
                .debug_struct(self.class_name())
                .field("cropping", cropping)
                .field("data_format", data_format)
                .finish(),
            LayerSpec::Lambda { .. } => f.write_str("Lambda { .. }"),
        }
    }
}

/// A layer instance registered in a session.
#[derive(Debug, Clone)]
pub struct LayerNode {
    /// Unique layer name.
    pub name: String,
    /// Layer configuration.
    pub spec: LayerSpec,
    /// Consumed tensor.
    pub input: String,
    /// Produced tensor.
    pub output: String,
}

/// Cropping layer over `R` spatial axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppingNd<const R: usize> {
    cropping: [(usize, usize); R],
    data_format: DataFormat,
    name: Option<String>,
}

/// Crops the temporal axis of `(batch, steps, features)` inputs.
pub type Cropping1D = CroppingNd<1>;
/// Crops height and width.
pub type Cropping2D = CroppingNd<2>;
/// Crops three spatial axes.
pub type Cropping3D = CroppingNd<3>;

impl<const R: usize> CroppingNd<R> {
    /// Create a cropping layer with the default channels-last format.
    pub fn new(cropping: impl Into<Cropping<R>>) -> Self {
        Self {
            cropping: cropping.into().resolve(),
            data_format: DataFormat::default(),
            name: None,
        }
    }

    /// Set the channel axis placement.
    pub fn with_data_format(mut self, data_format: DataFormat) -> Self {
        self.data_format = data_format;
        self
    }

    /// Give the layer an explicit name instead of a generated one.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Resolved `(begin, end)` amounts per spatial axis.
    pub fn cropping(&self) -> [(usize, usize); R] {
        self.cropping
    }

    /// Apply the layer to `x`, registering it in `session`.
    pub fn apply(
        &self,
        session: &mut FrameworkSession,
        x: &SymbolicTensor,
    ) -> Result<SymbolicTensor> {
        let spec = LayerSpec::Cropping {
            cropping: self.cropping.to_vec(),
            data_format: self.data_format,
        };
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| session.unique_name(&spec.class_name().to_lowercase()));

        if R == 1 && self.data_format == DataFormat::ChannelsFirst {
            return Err(FrameworkError::InvalidCropping {
                layer: name,
                reason: "Cropping1D only supports channels_last inputs".to_string(),
            });
        }

        register(session, name, spec, x)
    }
}

/// Shape-preserving layer wrapping a tensor function.
#[derive(Clone)]
pub struct Lambda {
    function: LambdaFn,
    name: Option<String>,
}

impl Lambda {
    /// Wrap `function`; it must return a tensor of the same shape.
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&Tensor) -> anyhow::Result<Tensor> + Send + Sync + 'static,
    {
        Self {
            function: Arc::new(function),
            name: None,
        }
    }

    /// Give the layer an explicit name instead of a generated one.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Apply the layer to `x`, registering it in `session`.
    pub fn apply(
        &self,
        session: &mut FrameworkSession,
        x: &SymbolicTensor,
    ) -> Result<SymbolicTensor> {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| session.unique_name("lambda"));
        let spec = LayerSpec::Lambda {
            function: Arc::clone(&self.function),
        };
        register(session, name, spec, x)
    }
}

/// Whether cropping `begin` and `end` from an axis of size `dim` leaves nothing.
fn crops_away(dim: usize, begin: usize, end: usize) -> bool {
    begin.checked_add(end).map_or(true, |total| total >= dim)
}

fn register(
    session: &mut FrameworkSession,
    name: String,
    spec: LayerSpec,
    x: &SymbolicTensor,
) -> Result<SymbolicTensor> {
    session.check_known(x)?;
    let shape = spec.output_shape(&name, &x.shape)?;
    let output = SymbolicTensor {
        name: format!("{}:0", name),
        shape,
        dtype: x.dtype,
    };
    let node = LayerNode {
        name,
        spec,
        input: x.name.clone(),
        output: output.name.clone(),
    };
    session.register_layer(node, output.clone())?;
    Ok(output)
}
