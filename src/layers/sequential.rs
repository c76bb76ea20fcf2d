//! Layer composition.
//!
//! [`Sequential`] chains two layers with static types; [`sequential!`] nests
//! 2 to 10 layers into `Sequential` pairs, right-associatively. [`Pipeline`]
//! chains any number of boxed layers and checks shapes as layers are added.
//!
//! [`sequential!`]: crate::sequential

use super::{BackFn, Layer, LayerGrad};
use crate::TensorFloat;
use crate::error::LayerError;
use crate::tensors::Tensor;

/// Two layers applied in order: `layer2(layer1(x))`.
///
/// The backward pass runs `layer2`'s backward closure, then `layer1`'s on the
/// resulting input cotangent. Parameters are `layer1`'s followed by `layer2`'s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequential<A, B> {
    pub layer1: A,
    pub layer2: B,
}

impl<A, B> Sequential<A, B> {
    /// Composes two layers. Shape compatibility is not checked here; use
    /// [`Layer::output_shape`] or [`Pipeline`] for that.
    pub fn new(layer1: A, layer2: B) -> Self {
        Self { layer1, layer2 }
    }
}

impl<A: Layer, B: Layer> Layer for Sequential<A, B> {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        let (hidden, back1) = self.layer1.run(input);
        let (output, back2) = self.layer2.run(&hidden);

        let back: BackFn = Box::new(move |dy| {
            let outer = back2(dy);
            let inner = back1(&outer.input);
            let mut parameters = inner.parameters;
            parameters.extend(outer.parameters);
            LayerGrad {
                input: inner.input,
                parameters,
            }
        });
        (output, back)
    }

    fn forward(&self, input: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        self.layer2.forward(&self.layer1.forward(input))
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        let mut params = self.layer1.parameters();
        params.extend(self.layer2.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        let mut params = self.layer1.parameters_mut();
        params.extend(self.layer2.parameters_mut());
        params
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        self.layer2.output_shape(&self.layer1.output_shape(input)?)
    }

    fn name(&self) -> &'static str {
        "Sequential"
    }
}

/// Chains 2 to 10 layers into nested [`Sequential`] pairs.
///
/// `sequential![a, b, c]` is `Sequential::new(a, Sequential::new(b, c))`.
/// Any other arity is rejected at compile time.
///
/// ```rust
/// use seqgrad::layers::{Activation, ActivationKind, Flatten, Sequential};
/// use seqgrad::sequential;
///
/// let model = sequential![Flatten, Activation(ActivationKind::Relu), Activation(ActivationKind::Tanh)];
/// let _: Sequential<Flatten, Sequential<Activation, Activation>> = model;
/// ```
///
/// ```compile_fail
/// use seqgrad::layers::Flatten;
/// let model = seqgrad::sequential![Flatten];
/// ```
#[macro_export]
macro_rules! sequential {
    ($l1:expr, $l2:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $l2)
    };
    ($l1:expr, $l2:expr, $l3:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $crate::sequential!($l2, $l3))
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $crate::sequential!($l2, $l3, $l4))
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr, $l5:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $crate::sequential!($l2, $l3, $l4, $l5))
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr, $l5:expr, $l6:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $crate::sequential!($l2, $l3, $l4, $l5, $l6))
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr, $l5:expr, $l6:expr, $l7:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $crate::sequential!($l2, $l3, $l4, $l5, $l6, $l7))
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr, $l5:expr, $l6:expr, $l7:expr, $l8:expr $(,)?) => {
        $crate::layers::Sequential::new($l1, $crate::sequential!($l2, $l3, $l4, $l5, $l6, $l7, $l8))
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr, $l5:expr, $l6:expr, $l7:expr, $l8:expr, $l9:expr $(,)?) => {
        $crate::layers::Sequential::new(
            $l1,
            $crate::sequential!($l2, $l3, $l4, $l5, $l6, $l7, $l8, $l9),
        )
    };
    ($l1:expr, $l2:expr, $l3:expr, $l4:expr, $l5:expr, $l6:expr, $l7:expr, $l8:expr, $l9:expr, $l10:expr $(,)?) => {
        $crate::layers::Sequential::new(
            $l1,
            $crate::sequential!($l2, $l3, $l4, $l5, $l6, $l7, $l8, $l9, $l10),
        )
    };
    ($($layer:expr),* $(,)?) => {
        compile_error!("sequential! takes between 2 and 10 layers")
    };
}

/// A runtime-length chain of boxed layers.
///
/// Each pushed layer is checked against the current output shape, so a
/// pipeline that was built successfully accepts inputs of its declared shape.
pub struct Pipeline {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    layers: Vec<Box<dyn Layer>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("input_shape", &self.input_shape)
            .field("output_shape", &self.output_shape)
            .field("layers", &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Pipeline {
    /// An empty pipeline (the identity) for inputs of `input_shape`.
    pub fn new(input_shape: impl Into<Vec<usize>>) -> Self {
        let input_shape = input_shape.into();
        Self {
            output_shape: input_shape.clone(),
            input_shape,
            layers: Vec::new(),
        }
    }

    /// Appends a layer.
    ///
    /// # Errors
    /// Returns [`LayerError`] when the layer cannot accept the current output
    /// shape; the pipeline is left unchanged.
    pub fn push(&mut self, layer: Box<dyn Layer>) -> Result<(), LayerError> {
        let output_shape = layer.output_shape(&self.output_shape)?;
        tracing::debug!(
            layer = layer.name(),
            input = ?self.output_shape,
            output = ?output_shape,
            "pipeline layer added"
        );
        self.output_shape = output_shape;
        self.layers.push(layer);
        Ok(())
    }

    /// Builder form of [`Pipeline::push`].
    ///
    /// # Errors
    /// Same as [`Pipeline::push`].
    pub fn with(mut self, layer: impl Layer + 'static) -> Result<Self, LayerError> {
        self.push(Box::new(layer))?;
        Ok(self)
    }

    /// Folds `layers` into a pipeline, stopping at the first incompatible layer.
    ///
    /// # Errors
    /// Same as [`Pipeline::push`].
    pub fn compose<I>(input_shape: impl Into<Vec<usize>>, layers: I) -> Result<Self, LayerError>
    where
        I: IntoIterator<Item = Box<dyn Layer>>,
    {
        let mut pipeline = Self::new(input_shape);
        for layer in layers {
            pipeline.push(layer)?;
        }
        Ok(pipeline)
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    /// Output shape for inputs of the declared input shape.
    pub fn final_shape(&self) -> &[usize] {
        &self.output_shape
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Layer for Pipeline {
    fn run(&self, input: &Tensor<TensorFloat>) -> (Tensor<TensorFloat>, BackFn) {
        let mut value = input.clone();
        let mut backs = Vec::with_capacity(self.layers.len());
        let mut counts = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (next, back) = layer.run(&value);
            value = next;
            backs.push(back);
            counts.push(layer.parameters().len());
        }

        let back: BackFn = Box::new(move |dy| {
            let mut cotangent = dy.clone();
            let mut per_layer = Vec::with_capacity(backs.len());
            for back in backs.iter().rev() {
                let grad = back(&cotangent);
                cotangent = grad.input;
                per_layer.push(grad.parameters);
            }
            debug_assert!(per_layer.iter().rev().map(Vec::len).eq(counts.iter().copied()));
            LayerGrad {
                input: cotangent,
                parameters: per_layer.into_iter().rev().flatten().collect(),
            }
        });
        (value, back)
    }

    fn forward(&self, input: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        self.layers
            .iter()
            .fold(input.clone(), |value, layer| layer.forward(&value))
    }

    fn parameters(&self) -> Vec<&Tensor<TensorFloat>> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<TensorFloat>> {
        self.layers.iter_mut().flat_map(|l| l.parameters_mut()).collect()
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, LayerError> {
        self.layers
            .iter()
            .try_fold(input.to_vec(), |shape, layer| layer.output_shape(&shape))
    }

    fn name(&self) -> &'static str {
        "Pipeline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Activation, ActivationKind, Dense, Flatten};

    #[test]
    fn push_rejects_incompatible_layers() {
        let mut pipeline = Pipeline::new(vec![4, 3]);
        pipeline.push(Box::new(Dense::new(3, 5, ActivationKind::Relu, 0))).unwrap();
        let err = pipeline.push(Box::new(Dense::new(3, 2, ActivationKind::Relu, 1)));
        assert!(matches!(err, Err(LayerError::IncompatibleInput { layer: "Dense", .. })));
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.final_shape(), &[4, 5]);
    }

    #[test]
    fn nested_output_shapes_chain() {
        let model = crate::sequential![Flatten, Dense::new(6, 2, ActivationKind::Identity, 3), Activation::default()];
        assert_eq!(model.output_shape(&[7, 2, 3]).unwrap(), vec![7, 2]);
        assert!(model.output_shape(&[7, 5]).is_err());
    }
}
