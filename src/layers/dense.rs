use super::{ActivationKind, BackFn, Layer, LayerGrad, expect_features};
use crate::TensorFloat;
use crate::autodiff::Tape;
use crate::error::LayerError;
use crate::tensors::Tensor;

/// Fully connected layer: `activation(x · weight + bias)`.
///
/// Input is `[batch, input_size]`, output `[batch, output_size]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    /// Shape `[input_size, output_size]`.
    pub weight: Tensor<TensorFloat>,
    /// Shape `[output_size]`.
    pub bias: Tensor<TensorFloat>,
    pub activation: ActivationKind,
}

impl Dense {
    /// Glorot-uniform weights and zero bias, deterministic for `seed`.
    pub fn new(input_size: usize, output_size: usize, activation: ActivationKind, seed: u64) -> Self {
        Self {
            weight: Tensor::glorot_uniform(vec![input_size, output_size], seed),
            bias: Tensor::zeros(vec![output_size]),
            activation,
        }
    }

    /// Builds a layer from existing parameters.
    ///
    /// # Errors
    /// Fails unless `weight` is rank 2 and `bias` is `[weight.shape()[1]]`.
    pub fn from_parameters(
        weight: Tensor<TensorFloat>,
        bias: Tensor<TensorFloat>,
        activation: ActivationKind,
    ) -> Result<Self, LayerError> {
        let &[_, output_size] = weight.shape() else {
            return Err(LayerError::ParameterShape {
                layer: "Dense",
                parameter: "weight",
                expected: vec![0, 0],
                got: weight.shape().to_vec(),
            });
        };
        if bias.shape() != [output_size] {
            return Err(LayerError::ParameterShape {
                layer: "Dense",
                parameter: "bias",
                expected: vec![output_size],
                got: bias.shape().to_vec(),
            });
        }
        Ok(Self {
            weight,
            bias,
            activation,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weight.shape()[1]
    }
}

impl Layer for Dense {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        if let Err(err) = self.output_shape(input.shape()) {
            panic!("{err}");
        }

        let tape = Tape::new();
        let x = tape.var(input.clone());
        let w = tape.var(self.weight.clone());
        let b = tape.var(self.bias.clone());
        let y = self.activation.apply_var(&(x.matmul(&w) + &b));
        let out = y.value().clone();

        let back: BackFn = Box::new(move |dy| {
            let grads = y.backward_with(dy.clone());
            LayerGrad {
                input: grads.wrt(&x),
                parameters: vec![grads.wrt(&w), grads.wrt(&b)],
            }
        });
        (out, back)
    }

    fn forward(&self, input: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        if let Err(err) = self.output_shape(input.shape()) {
            panic!("{err}");
        }
        self.activation.apply(&(input.matmul(&self.weight) + &self.bias))
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        expect_features(self.name(), input, self.input_size())?;
        Ok(vec![input[0], self.output_size()])
    }

    fn name(&self) -> &'static str {
        "Dense"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_map_matches_hand_computation() {
        let dense = Dense::from_parameters(
            Tensor::new(vec![2, 2], vec![1.0_f32, 0.5, 2.0, 1.0]),
            Tensor::from_vec(vec![0.5_f32, -0.5]),
            ActivationKind::Identity,
        )
        .unwrap();
        let y = dense.forward(&Tensor::new(vec![1, 2], vec![4.0_f32, 4.0]));
        assert_eq!(y.data(), &[12.5, 5.5]);
    }

    #[test]
    fn rejects_mismatched_bias() {
        let err = Dense::from_parameters(Tensor::zeros(vec![2, 3]), Tensor::zeros(vec![2]), ActivationKind::Relu);
        assert!(matches!(err, Err(LayerError::ParameterShape { parameter: "bias", .. })));
    }
}
