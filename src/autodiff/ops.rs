//! Differentiable operations on [`Var`].
//!
//! Every operation computes its value eagerly and records a pullback. Binary
//! operations broadcast, and their pullbacks sum each cotangent back onto the
//! operand's own shape.

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::Var;
use crate::TensorFloat;
use crate::math::activation::{elu_scalar, gelu_derivative, sigmoid_scalar};
use crate::math::elementwise::sign_scalar;
use crate::shape::{element_count, keep_dims, normalize_axes};
use crate::tensors::Tensor;

type T = Tensor<TensorFloat>;

fn binary<F>(lhs: &Var, rhs: &Var, value: T, pullback: F) -> Var
where
    F: Fn(&T) -> (T, T) + 'static,
{
    let lhs_shape = lhs.shape().to_vec();
    let rhs_shape = rhs.shape().to_vec();
    lhs.record(
        value,
        &[lhs, rhs],
        Box::new(move |g| {
            let (dl, dr) = pullback(g);
            vec![dl.reduce_to_shape(&lhs_shape), dr.reduce_to_shape(&rhs_shape)]
        }),
    )
}

fn add(lhs: &Var, rhs: &Var) -> Var {
    binary(lhs, rhs, lhs.value() + rhs.value(), |g| (g.clone(), g.clone()))
}

fn sub(lhs: &Var, rhs: &Var) -> Var {
    binary(lhs, rhs, lhs.value() - rhs.value(), |g| (g.clone(), -g))
}

fn mul(lhs: &Var, rhs: &Var) -> Var {
    let (a, b) = (lhs.value().clone(), rhs.value().clone());
    binary(lhs, rhs, &a * &b, move |g| (g * &b, g * &a))
}

fn div(lhs: &Var, rhs: &Var) -> Var {
    let (a, b) = (lhs.value().clone(), rhs.value().clone());
    binary(lhs, rhs, &a / &b, move |g| {
        let dl = g / &b;
        let dr = -(&dl * &a / &b);
        (dl, dr)
    })
}

macro_rules! var_operator {
    ($($trait:ident, $method:ident => $imp:ident;)*) => {$(
        impl $trait<&Var> for &Var {
            type Output = Var;
            fn $method(self, rhs: &Var) -> Var {
                $imp(self, rhs)
            }
        }

        impl $trait<Var> for Var {
            type Output = Var;
            fn $method(self, rhs: Var) -> Var {
                $imp(&self, &rhs)
            }
        }

        impl $trait<&Var> for Var {
            type Output = Var;
            fn $method(self, rhs: &Var) -> Var {
                $imp(&self, rhs)
            }
        }

        impl $trait<Var> for &Var {
            type Output = Var;
            fn $method(self, rhs: Var) -> Var {
                $imp(self, &rhs)
            }
        }

        impl $trait<TensorFloat> for &Var {
            type Output = Var;
            fn $method(self, rhs: TensorFloat) -> Var {
                $imp(self, &self.lift(Tensor::scalar(rhs)))
            }
        }

        impl $trait<TensorFloat> for Var {
            type Output = Var;
            fn $method(self, rhs: TensorFloat) -> Var {
                $imp(&self, &self.lift(Tensor::scalar(rhs)))
            }
        }

        impl $trait<&Var> for TensorFloat {
            type Output = Var;
            fn $method(self, rhs: &Var) -> Var {
                $imp(&rhs.lift(Tensor::scalar(self)), rhs)
            }
        }

        impl $trait<Var> for TensorFloat {
            type Output = Var;
            fn $method(self, rhs: Var) -> Var {
                $imp(&rhs.lift(Tensor::scalar(self)), &rhs)
            }
        }
    )*};
}

var_operator! {
    Add, add => add;
    Sub, sub => sub;
    Mul, mul => mul;
    Div, div => div;
}

impl Neg for &Var {
    type Output = Var;
    fn neg(self) -> Var {
        self.unary(-self.value(), |g| -g)
    }
}

impl Neg for Var {
    type Output = Var;
    fn neg(self) -> Var {
        -&self
    }
}

impl Var {
    fn unary<F>(&self, value: T, pullback: F) -> Var
    where
        F: Fn(&T) -> T + 'static,
    {
        self.record(value, &[self], Box::new(move |g| vec![pullback(g)]))
    }

    // Pullback `g * f'(x)` for a pointwise derivative of the input.
    fn pointwise<F>(&self, value: T, derivative: F) -> Var
    where
        F: Fn(TensorFloat) -> TensorFloat + Sync + Send + 'static,
    {
        let x = self.value().clone();
        self.unary(value, move |g| g * &x.map(&derivative))
    }

    pub fn exp(&self) -> Var {
        let y = self.value().exp();
        let out = y.clone();
        self.unary(y, move |g| g * &out)
    }

    pub fn log(&self) -> Var {
        let x = self.value().clone();
        self.unary(x.log(), move |g| g / &x)
    }

    pub fn sqrt(&self) -> Var {
        let y = self.value().sqrt();
        let out = y.clone();
        self.unary(y, move |g| g * 0.5 / &out)
    }

    pub fn sin(&self) -> Var {
        self.pointwise(self.value().sin(), f32::cos)
    }

    pub fn cos(&self) -> Var {
        self.pointwise(self.value().cos(), |x| -x.sin())
    }

    pub fn tanh(&self) -> Var {
        let y = self.value().tanh();
        let out = y.clone();
        self.unary(y, move |g| g * &out.map(|t| 1.0 - t * t))
    }

    pub fn sigmoid(&self) -> Var {
        let y = self.value().sigmoid();
        let out = y.clone();
        self.unary(y, move |g| g * &out.map(|s| s * (1.0 - s)))
    }

    pub fn relu(&self) -> Var {
        self.pointwise(self.value().relu(), |x| if x > 0.0 { 1.0 } else { 0.0 })
    }

    pub fn leaky_relu(&self, alpha: TensorFloat) -> Var {
        self.pointwise(self.value().leaky_relu(alpha), move |x| if x > 0.0 { 1.0 } else { alpha })
    }

    pub fn softplus(&self) -> Var {
        self.pointwise(self.value().softplus(), sigmoid_scalar)
    }

    pub fn gelu(&self) -> Var {
        self.pointwise(self.value().gelu(), gelu_derivative)
    }

    pub fn elu(&self) -> Var {
        self.pointwise(self.value().elu(), |x| if x > 0.0 { 1.0 } else { elu_scalar(x) + 1.0 })
    }

    pub fn squared(&self) -> Var {
        self.pointwise(self.value().squared(), |x| 2.0 * x)
    }

    pub fn powf(&self, exponent: TensorFloat) -> Var {
        self.pointwise(self.value().powf(exponent), move |x| exponent * x.powf(exponent - 1.0))
    }

    /// `|x|`, with derivative `0` at `0`.
    pub fn abs(&self) -> Var {
        self.pointwise(self.value().abs(), sign_scalar)
    }

    /// Sum of every element, as a rank-0 value.
    pub fn sum(&self) -> Var {
        let shape = self.shape().to_vec();
        self.unary(self.value().sum(), move |g| g.broadcast_to(&shape))
    }

    /// Sums over `axes`, removing them.
    ///
    /// # Panics
    /// Panics if an axis is out of range.
    pub fn sum_squeezing(&self, axes: &[isize]) -> Var {
        let value = self.value().sum_squeezing(axes);
        let shape = self.shape().to_vec();
        let kept = keep_dims(&shape, &normalize_axes(axes, shape.len()).unwrap_or_default());
        self.unary(value, move |g| g.reshaped(kept.clone()).broadcast_to(&shape))
    }

    /// Sums over `axes`, keeping them with size 1.
    ///
    /// # Panics
    /// Panics if an axis is out of range.
    pub fn sum_along(&self, axes: &[isize]) -> Var {
        let shape = self.shape().to_vec();
        self.unary(self.value().sum_along(axes), move |g| g.broadcast_to(&shape))
    }

    /// Mean of every element, as a rank-0 value.
    pub fn mean(&self) -> Var {
        let count = self.value().len().max(1);
        self.sum() / count as TensorFloat
    }

    /// Mean over `axes`, keeping them with size 1.
    ///
    /// # Panics
    /// Panics if an axis is out of range.
    pub fn mean_along(&self, axes: &[isize]) -> Var {
        let summed = self.sum_along(axes);
        let count = self.value().len() / element_count(summed.shape()).max(1);
        summed / count.max(1) as TensorFloat
    }

    /// Batched matrix product; see [`Tensor::matmul`].
    ///
    /// # Panics
    /// Panics on incompatible shapes.
    pub fn matmul(&self, rhs: &Var) -> Var {
        let (a, b) = (self.value().clone(), rhs.value().clone());
        binary(self, rhs, a.matmul(&b), move |g| {
            (g.matmul(&b.transposed()), a.transposed().matmul(g))
        })
    }

    /// # Panics
    /// Panics if the element count changes.
    pub fn reshaped(&self, shape: impl Into<Vec<usize>>) -> Var {
        let original = self.shape().to_vec();
        self.unary(self.value().reshaped(shape), move |g| g.reshaped(original.clone()))
    }

    /// Swaps the last two axes.
    pub fn transposed(&self) -> Var {
        self.unary(self.value().transposed(), |g| g.transposed())
    }

    /// # Panics
    /// Panics if this value does not broadcast to `shape`.
    pub fn broadcast_to(&self, shape: &[usize]) -> Var {
        let original = self.shape().to_vec();
        self.unary(self.value().broadcast_to(shape), move |g| g.reduce_to_shape(&original))
    }

    /// Log-softmax along `axis`.
    ///
    /// # Panics
    /// Panics if `axis` is out of range.
    pub fn log_softmax(&self, axis: isize) -> Var {
        let y = self.value().log_softmax(axis);
        let softmax = y.exp();
        self.unary(y, move |g| g - &(&softmax * &g.sum_along(&[axis])))
    }
}
