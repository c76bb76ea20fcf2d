use super::{BackFn, Layer, LayerGrad};
use crate::TensorFloat;
use crate::autodiff::{Tape, Var};
use crate::error::LayerError;
use crate::tensors::Tensor;

/// Pointwise (or per-row, for the softmax family) nonlinearity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ActivationKind {
    #[default]
    Identity,
    Relu,
    LeakyRelu(TensorFloat),
    Sigmoid,
    Tanh,
    Softplus,
    Gelu,
    Elu,
    /// Log-softmax over the last axis.
    LogSoftmax,
}

impl ActivationKind {
    /// Applies the activation to a plain tensor.
    pub fn apply(self, x: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        match self {
            Self::Identity => x.clone(),
            Self::Relu => x.relu(),
            Self::LeakyRelu(alpha) => x.leaky_relu(alpha),
            Self::Sigmoid => x.sigmoid(),
            Self::Tanh => x.tanh(),
            Self::Softplus => x.softplus(),
            Self::Gelu => x.gelu(),
            Self::Elu => x.elu(),
            Self::LogSoftmax => x.log_softmax(-1),
        }
    }

    /// Applies the activation on the tape.
    pub fn apply_var(self, x: &Var) -> Var {
        match self {
            Self::Identity => x.clone(),
            Self::Relu => x.relu(),
            Self::LeakyRelu(alpha) => x.leaky_relu(alpha),
            Self::Sigmoid => x.sigmoid(),
            Self::Tanh => x.tanh(),
            Self::Softplus => x.softplus(),
            Self::Gelu => x.gelu(),
            Self::Elu => x.elu(),
            Self::LogSoftmax => x.log_softmax(-1),
        }
    }
}

/// A parameter-free layer applying an [`ActivationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Activation(pub ActivationKind);

impl Layer for Activation {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        let kind = self.0;
        let tape = Tape::new();
        let x = tape.var(input.clone());
        let y = kind.apply_var(&x);
        let out = y.value().clone();

        let back: BackFn = Box::new(move |dy| LayerGrad {
            input: y.backward_with(dy.clone()).wrt(&x),
            parameters: Vec::new(),
        });
        (out, back)
    }

    fn forward(&self, input: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        self.0.apply(input)
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        Vec::new()
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        if matches!(self.0, ActivationKind::LogSoftmax) && input.is_empty() {
            return Err(LayerError::IncompatibleInput {
                layer: self.name(),
                input: input.to_vec(),
                reason: "log-softmax needs at least one axis".into(),
            });
        }
        Ok(input.to_vec())
    }

    fn name(&self) -> &'static str {
        "Activation"
    }
}
