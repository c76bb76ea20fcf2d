//! Differentiable layers.
//!
//! A [`Layer`] maps a batch tensor to a batch tensor and exposes its
//! parameters. [`Layer::run`] returns the output together with a backward
//! closure; calling that closure with the output cotangent yields a
//! [`LayerGrad`] holding the input cotangent and one gradient per parameter.
//!
//! Layers compose statically with [`Sequential`] (or the [`sequential!`]
//! macro) and dynamically with [`Pipeline`].
//!
//! ```rust
//! use seqgrad::layers::{ActivationKind, Dense, Layer};
//! use seqgrad::sequential;
//! use seqgrad::tensors::Tensor;
//!
//! let model = sequential![
//!     Dense::new(2, 4, ActivationKind::Tanh, 1),
//!     Dense::new(4, 1, ActivationKind::Sigmoid, 2),
//! ];
//! let y = model.forward(&Tensor::zeros(vec![3, 2]));
//! assert_eq!(y.shape(), &[3, 1]);
//! assert_eq!(model.parameter_count(), 2 * 4 + 4 + 4 + 1);
//! ```
//!
//! [`sequential!`]: crate::sequential

mod activation;
mod dense;
mod reshape;
mod sequential;

pub use activation::{Activation, ActivationKind};
pub use dense::Dense;
pub use reshape::{Flatten, Reshape};
pub use sequential::{Pipeline, Sequential};

use crate::TensorFloat;
use crate::error::LayerError;
use crate::tensors::Tensor;

/// Gradients produced by a layer's backward closure.
#[derive(Debug, Clone)]
pub struct LayerGrad {
    /// Cotangent of the layer input.
    pub input: Tensor<TensorFloat>,
    /// One gradient per parameter, in [`Layer::parameters`] order.
    pub parameters: Vec<Tensor<TensorFloat>>,
}

/// Backward closure returned by [`Layer::run`].
pub type BackFn = Box<dyn Fn(&Tensor<TensorFloat>) -> LayerGrad>;

/// A differentiable transformation of a batch of inputs.
pub trait Layer {
    /// Applies the layer, returning the output and its backward closure.
    ///
    /// # Panics
    /// Panics when the input shape is not accepted by the layer.
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn);

    /// Applies the layer.
    fn forward(&self, input: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        self.run(input).0
    }

    /// Trainable parameters.
    fn parameters(&self) -> Vec<&Tensor<TensorFloat>>;

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>>;

    /// Total number of trainable scalars.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// Shape of the output for an input of shape `input`.
    ///
    /// # Errors
    /// Returns [`LayerError`] when the layer cannot accept `input`.
    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError>;

    fn name(&self) -> &'static str;
}

impl<L: Layer + ?Sized> Layer for Box<L> {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        (**self).run(input)
    }

    fn forward(&self, input: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        (**self).forward(input)
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        (**self).parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        (**self).parameters_mut()
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        (**self).output_shape(input)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Checks that a layer accepts `[batch, features]` input.
pub(crate) fn expect_features(layer: &'static str, input: &[usize], features: usize) -> Result<(), LayerError> {
    match input {
        [_, f] if *f == features => Ok(()),
        _ => Err(LayerError::IncompatibleInput {
            layer,
            input: input.to_vec(),
            reason: format!("expected [batch, {features}]"),
        }),
    }
}
