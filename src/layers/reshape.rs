use super::{BackFn, Layer, LayerGrad};
use crate::TensorFloat;
use crate::error::LayerError;
use crate::shape::element_count;
use crate::tensors::Tensor;

/// Reshapes every sample to `target`, keeping the batch axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reshape {
    pub target: Vec<usize>,
}

impl Reshape {
    pub fn new(target: impl Into<Vec<usize>>) -> Self {
        Self { target: target.into() }
    }
}

impl Layer for Reshape {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        let shape = self.output_shape(input.shape()).unwrap_or_else(|err| panic!("{err}"));
        reshape_run(input, shape)
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        Vec::new()
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        let Some((&batch, sample)) = input.split_first() else {
            return Err(LayerError::IncompatibleInput {
                layer: self.name(),
                input: input.to_vec(),
                reason: "missing batch axis".into(),
            });
        };
        if element_count(sample) != element_count(&self.target) {
            return Err(LayerError::IncompatibleInput {
                layer: self.name(),
                input: input.to_vec(),
                reason: format!("samples do not have {} elements", element_count(&self.target)),
            });
        }
        let mut shape = vec![batch];
        shape.extend_from_slice(&self.target);
        Ok(shape)
    }

    fn name(&self) -> &'static str {
        "Reshape"
    }
}

/// Collapses every non-batch axis into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flatten;

impl Layer for Flatten {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        let shape = self.output_shape(input.shape()).unwrap_or_else(|err| panic!("{err}"));
        reshape_run(input, shape)
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        Vec::new()
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        match input.split_first() {
            Some((&batch, sample)) => Ok(vec![batch, element_count(sample)]),
            None => Err(LayerError::IncompatibleInput {
                layer: self.name(),
                input: Vec::new(),
                reason: "missing batch axis".into(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "Flatten"
    }
}

fn reshape_run(input: &Tensor<TensorFloat>, shape: Vec<usize>) -> (Tensor<TensorFloat>, BackFn) {
    let original = input.shape().to_vec();
    let back: BackFn = Box::new(move |dy| LayerGrad {
        input: dy.reshaped(original.clone()),
        parameters: Vec::new(),
    });
    (input.reshaped(shape), back)
}
