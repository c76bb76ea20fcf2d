//! One-call training step.

use crate::TensorFloat;
use crate::autodiff::{Tape, Var};
use crate::layers::Layer;
use crate::optim::Optimizer;
use crate::tensors::Tensor;

/// Runs forward, loss, backward and one optimiser update. Returns the loss
/// measured before the update.
///
/// `loss` receives the model output recorded on a fresh tape and must return
/// a single-element value.
///
/// # Panics
/// Panics on shape errors in the model or loss, or if the loss is not a
/// single element.
pub fn train_step<L, O, Target, F>(
    model: &mut L,
    optimizer: &mut O,
    input: &Tensor<TensorFloat>,
    target: &Target,
    loss: F,
) -> TensorFloat
where
    L: Layer + ?Sized,
    O: Optimizer + ?Sized,
    Target: ?Sized,
    F: FnOnce(&Var, &Target) -> Var,
{
    let (prediction, back) = model.run(input);

    let tape = Tape::new();
    let prediction = tape.var(prediction);
    let value = loss(&prediction, target);
    let cotangent = value.backward().wrt(&prediction);

    let grads = back(&cotangent);
    optimizer.update(model.parameters_mut(), &grads.parameters);

    let value = value.value().scalarized();
    tracing::trace!(loss = value, "train step");
    value
}
