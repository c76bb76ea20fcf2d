//! Differentiable losses.
//!
//! Each loss takes predictions recorded on a tape and constant targets, and
//! returns a rank-0 [`Var`] averaged over every element (or every sample for
//! the cross-entropies).

use crate::TensorFloat;
use crate::autodiff::Var;
use crate::error::ShapeError;
use crate::tensors::Tensor;

/// `mean((pred - target)^2)`.
///
/// # Panics
/// Panics if the shapes cannot be broadcast together.
pub fn mean_squared_error(pred: &Var, target: &Tensor<TensorFloat>) -> Var {
    (pred - pred.lift(target.clone())).squared().mean()
}

/// `mean(|pred - target|)`.
///
/// # Panics
/// Panics if the shapes cannot be broadcast together.
pub fn mean_absolute_error(pred: &Var, target: &Tensor<TensorFloat>) -> Var {
    (pred - pred.lift(target.clone())).abs().mean()
}

/// Mean negative log-likelihood of integer class `labels` under
/// `softmax(logits)`.
///
/// `logits` is `[batch, classes]` and `labels` is `[batch]`.
///
/// # Errors
/// Fails on mismatched shapes or labels outside `0..classes`.
pub fn try_softmax_cross_entropy(logits: &Var, labels: &Tensor<i64>) -> Result<Var, ShapeError> {
    let &[batch, classes] = logits.shape() else {
        return Err(ShapeError::Rank {
            op: "softmax_cross_entropy",
            expected: "logits of shape [batch, classes]",
            shape: logits.shape().to_vec(),
        });
    };
    if labels.shape() != [batch] {
        return Err(ShapeError::Mismatch {
            expected: vec![batch],
            got: labels.shape().to_vec(),
        });
    }

    let mut one_hot = vec![0.0; batch * classes];
    for (row, &label) in labels.data().iter().enumerate() {
        let class = usize::try_from(label)
            .ok()
            .filter(|&c| c < classes)
            .ok_or(ShapeError::InvalidAxis {
                axis: label as isize,
                rank: classes,
            })?;
        one_hot[row * classes + class] = 1.0;
    }
    let one_hot = logits.lift(Tensor::try_new(vec![batch, classes], one_hot)?);

    let picked = (logits.log_softmax(-1) * one_hot).sum();
    Ok(-picked / batch.max(1) as TensorFloat)
}

/// Mean negative log-likelihood of integer class `labels` under
/// `softmax(logits)`.
///
/// # Panics
/// Panics on the conditions listed for [`try_softmax_cross_entropy`].
pub fn softmax_cross_entropy(logits: &Var, labels: &Tensor<i64>) -> Var {
    try_softmax_cross_entropy(logits, labels).unwrap_or_else(|err| panic!("{err}"))
}

/// Binary cross-entropy between `sigmoid(logits)` and `targets` in `[0, 1]`.
///
/// Computed as `softplus(x) - x * t`, which stays finite for large logits.
///
/// # Panics
/// Panics if the shapes cannot be broadcast together.
pub fn sigmoid_cross_entropy(logits: &Var, targets: &Tensor<TensorFloat>) -> Var {
    (logits.softplus() - logits * logits.lift(targets.clone())).mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodiff::Tape;

    #[test]
    fn uniform_logits_give_log_classes() {
        let tape = Tape::new();
        let logits = tape.var(Tensor::zeros(vec![2, 4]));
        let loss = softmax_cross_entropy(&logits, &Tensor::from_vec(vec![0, 3]));
        assert!((loss.value().scalarized() - 4.0_f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let tape = Tape::new();
        let logits = tape.var(Tensor::zeros(vec![1, 2]));
        assert!(try_softmax_cross_entropy(&logits, &Tensor::from_vec(vec![2])).is_err());
        assert!(try_softmax_cross_entropy(&logits, &Tensor::from_vec(vec![-1])).is_err());
    }
}
