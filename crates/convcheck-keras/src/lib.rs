//! Minimal Keras-style functional models for conversion tests.
//!
//! Models are assembled inside an explicit [`FrameworkSession`]: inputs and
//! layers register themselves with the session, and [`Model::new`] collects
//! the layers between a set of inputs and outputs. Models run natively with
//! [`Model::predict`], which is the reference side of a conversion check.
//!
//! ```rust
//! use convcheck_core::{DataType, Tensor};
//! use convcheck_keras::{Cropping2D, FrameworkSession, Model};
//!
//! let mut session = FrameworkSession::new();
//! let x = session.input(&[5, 7, 5], DataType::F32, "x")?;
//! let y = Cropping2D::new(2).apply(&mut session, &x)?;
//! let model = Model::new(&mut session, vec![x], vec![y])?;
//!
//! let input = Tensor::zeros(vec![3, 5, 7, 5], DataType::F32)?;
//! let outputs = model.predict(&[input])?;
//! assert_eq!(outputs[0].shape(), vec![3, 1, 3, 5]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
pub mod layers;
mod model;
mod session;

pub use error::{FrameworkError, Result};
pub use layers::{
    Cropping, Cropping1D, Cropping2D, Cropping3D, CroppingNd, DataFormat, Lambda, LayerNode,
    LayerSpec,
};
pub use model::Model;
pub use session::{FrameworkSession, SymbolicTensor};
