//! Activation functions.
//!
//! Scalar kernels are shared with the gradient tape, which needs the same
//! numerically stable forms for its backward closures.

use crate::TensorFloat;
use crate::tensors::Tensor;

/// `sqrt(2 / pi)`, used by the tanh approximation of GELU.
pub(crate) const GELU_SCALE: f32 = 0.797_884_6;
pub(crate) const GELU_CUBIC: f32 = 0.044_715;

const SELU_ALPHA: f32 = 1.673_263_2;
const SELU_SCALE: f32 = 1.050_701;

#[inline]
pub(crate) fn sigmoid_scalar(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[inline]
pub(crate) fn softplus_scalar(x: f32) -> f32 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

#[inline]
pub(crate) fn gelu_scalar(x: f32) -> f32 {
    0.5 * x * (1.0 + (GELU_SCALE * (x + GELU_CUBIC * x * x * x)).tanh())
}

/// Derivative of [`gelu_scalar`].
#[inline]
pub(crate) fn gelu_derivative(x: f32) -> f32 {
    let t = (GELU_SCALE * (x + GELU_CUBIC * x * x * x)).tanh();
    0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * GELU_SCALE * (1.0 + 3.0 * GELU_CUBIC * x * x)
}

#[inline]
pub(crate) fn elu_scalar(x: f32) -> f32 {
    if x > 0.0 { x } else { x.exp_m1() }
}

impl Tensor<TensorFloat> {
    /// `max(0, x)`.
    #[must_use]
    pub fn relu(&self) -> Tensor<TensorFloat> {
        self.map(|x| x.max(0.0))
    }

    /// `min(max(0, x), 6)`.
    #[must_use]
    pub fn relu6(&self) -> Tensor<TensorFloat> {
        self.map(|x| x.clamp(0.0, 6.0))
    }

    /// Logistic sigmoid `1 / (1 + exp(-x))`.
    #[must_use]
    pub fn sigmoid(&self) -> Tensor<TensorFloat> {
        self.map(sigmoid_scalar)
    }

    /// `log(sigmoid(x))`, computed as `-softplus(-x)`.
    #[must_use]
    pub fn log_sigmoid(&self) -> Tensor<TensorFloat> {
        self.map(|x| -softplus_scalar(-x))
    }

    /// `log(1 + exp(x))`.
    #[must_use]
    pub fn softplus(&self) -> Tensor<TensorFloat> {
        self.map(softplus_scalar)
    }

    /// `x / (1 + |x|)`.
    #[must_use]
    pub fn softsign(&self) -> Tensor<TensorFloat> {
        self.map(|x| x / (1.0 + x.abs()))
    }

    /// Exponential linear unit: `x` if positive, `exp(x) - 1` otherwise.
    #[must_use]
    pub fn elu(&self) -> Tensor<TensorFloat> {
        self.map(elu_scalar)
    }

    /// Scaled exponential linear unit.
    #[must_use]
    pub fn selu(&self) -> Tensor<TensorFloat> {
        self.map(|x| {
            if x > 0.0 {
                SELU_SCALE * x
            } else {
                SELU_SCALE * SELU_ALPHA * x.exp_m1()
            }
        })
    }

    /// Gaussian error linear unit, tanh approximation.
    #[must_use]
    pub fn gelu(&self) -> Tensor<TensorFloat> {
        self.map(gelu_scalar)
    }

    /// `x` if positive, `alpha * x` otherwise.
    #[must_use]
    pub fn leaky_relu(&self, alpha: TensorFloat) -> Tensor<TensorFloat> {
        self.map(move |x| if x > 0.0 { x } else { alpha * x })
    }

    /// `x * sigmoid(x)`.
    #[must_use]
    pub fn swish(&self) -> Tensor<TensorFloat> {
        self.map(|x| x * sigmoid_scalar(x))
    }

    /// Softmax along `axis`, stabilised by the maximum.
    ///
    /// # Panics
    /// Panics if `axis` is out of range.
    #[must_use]
    pub fn softmax(&self, axis: isize) -> Tensor<TensorFloat> {
        let shifted = self - &self.max_along(&[axis]).map(finite_or_zero);
        let e = shifted.exp();
        let total = e.sum_along(&[axis]);
        &e / &total
    }

    /// Log-softmax along `axis`.
    ///
    /// # Panics
    /// Panics if `axis` is out of range.
    #[must_use]
    pub fn log_softmax(&self, axis: isize) -> Tensor<TensorFloat> {
        self - &self.log_sum_exp_along(&[axis])
    }

    /// Cosine similarity over all elements, as a rank-0 tensor.
    ///
    /// # Panics
    /// Panics if the shapes cannot be broadcast together.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        let dot = (self * other).sum();
        let norms = self.squared().sum().sqrt() * other.squared().sum().sqrt();
        dot / norms
    }
}

#[inline]
pub(crate) fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gelu_derivative_matches_finite_difference() {
        for &x in &[-2.0_f32, -0.3, 0.0, 0.7, 2.5] {
            let h = 1e-3;
            let numeric = (gelu_scalar(x + h) - gelu_scalar(x - h)) / (2.0 * h);
            assert!((numeric - gelu_derivative(x)).abs() < 1e-2, "x = {x}");
        }
    }

    #[test]
    fn sigmoid_is_stable_for_large_inputs() {
        assert_eq!(sigmoid_scalar(-1000.0), 0.0);
        assert_eq!(sigmoid_scalar(1000.0), 1.0);
        assert!(softplus_scalar(1000.0).is_finite());
    }
}
