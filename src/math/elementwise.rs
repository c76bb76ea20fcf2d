//! Elementwise functions and broadcasting arithmetic on `Tensor<f32>`.
//!
//! Every unary function here equals the scalar function applied to each element.
//! Binary operations broadcast their operands (see [`crate::shape`]).
//!
//! ```rust
//! use seqgrad::{tensor, tensors::Tensor};
//!
//! let x: Tensor<f32> = tensor!([[1.0, 2.0], [3.0, 4.0]]);
//! let b: Tensor<f32> = tensor!([10.0, 20.0]);
//! let y = &x + &b;
//! assert_eq!(y.data(), &[11.0, 22.0, 13.0, 24.0]);
//! ```

use crate::TensorFloat;
use crate::error::ShapeError;
use crate::shape::{broadcast_shapes, broadcast_strides, element_count, source_index};
use crate::tensors::Tensor;
use core::ops::{Add, Div, Mul, Neg, Sub};
use rayon::prelude::*;

/// Combines two tensors elementwise after broadcasting them to a common shape.
///
/// # Errors
/// Returns [`ShapeError::Broadcast`] when the shapes are incompatible.
pub fn try_zip_map<A, B, R, F>(lhs: &Tensor<A>, rhs: &Tensor<B>, f: F) -> Result<Tensor<R>, ShapeError>
where
    A: Copy + Sync,
    B: Copy + Sync,
    R: Send,
    F: Fn(A, B) -> R + Sync + Send,
{
    if lhs.shape() == rhs.shape() {
        let data = lhs
            .data()
            .par_iter()
            .zip(rhs.data().par_iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        return Tensor::try_new(lhs.shape().to_vec(), data);
    }

    let shape = broadcast_shapes(lhs.shape(), rhs.shape())?;
    let lhs_strides = broadcast_strides(lhs.shape(), &shape);
    let rhs_strides = broadcast_strides(rhs.shape(), &shape);
    let (a, b) = (lhs.data(), rhs.data());

    let data = (0..element_count(&shape))
        .into_par_iter()
        .map(|i| {
            f(
                a[source_index(i, &shape, &lhs_strides)],
                b[source_index(i, &shape, &rhs_strides)],
            )
        })
        .collect();

    Tensor::try_new(shape, data)
}

/// Like [`try_zip_map`] but panics on incompatible shapes.
///
/// # Panics
/// Panics if the shapes cannot be broadcast together.
pub fn zip_map<A, B, R, F>(lhs: &Tensor<A>, rhs: &Tensor<B>, f: F) -> Tensor<R>
where
    A: Copy + Sync,
    B: Copy + Sync,
    R: Send,
    F: Fn(A, B) -> R + Sync + Send,
{
    try_zip_map(lhs, rhs, f).unwrap_or_else(|err| panic!("{err}"))
}

macro_rules! unary_functions {
    ($( $(#[$doc:meta])* $name:ident => $f:expr; )*) => {
        impl Tensor<TensorFloat> {
            $(
                $(#[$doc])*
                #[must_use]
                pub fn $name(&self) -> Tensor<TensorFloat> {
                    self.map($f)
                }
            )*
        }
    };
}

unary_functions! {
    /// Square root.
    sqrt => |x: f32| x.sqrt();
    /// Reciprocal square root.
    rsqrt => |x: f32| x.sqrt().recip();
    cos => |x: f32| x.cos();
    sin => |x: f32| x.sin();
    tan => |x: f32| x.tan();
    cosh => |x: f32| x.cosh();
    sinh => |x: f32| x.sinh();
    tanh => |x: f32| x.tanh();
    acos => |x: f32| x.acos();
    asin => |x: f32| x.asin();
    atan => |x: f32| x.atan();
    acosh => |x: f32| x.acosh();
    asinh => |x: f32| x.asinh();
    atanh => |x: f32| x.atanh();
    /// Natural exponential.
    exp => |x: f32| x.exp();
    /// Base-2 exponential.
    exp2 => |x: f32| x.exp2();
    /// Base-10 exponential.
    exp10 => |x: f32| (10.0_f32).powf(x);
    /// `exp(x) - 1`, accurate near zero.
    expm1 => |x: f32| x.exp_m1();
    /// Natural logarithm.
    log => |x: f32| x.ln();
    log2 => |x: f32| x.log2();
    log10 => |x: f32| x.log10();
    /// `log(1 + x)`, accurate near zero.
    log1p => |x: f32| x.ln_1p();
    /// `log(1 - exp(x))` for `x < 0`.
    log1mexp => log1mexp_scalar;
    abs => |x: f32| x.abs();
    /// `-1`, `0` or `1` following the sign of each element; NaN stays NaN.
    sign => sign_scalar;
    floor => |x: f32| x.floor();
    ceil => |x: f32| x.ceil();
    /// Rounds half away from zero.
    round => |x: f32| x.round();
    /// `x * x`.
    squared => |x: f32| x * x;
    /// `1 / x`.
    reciprocal => |x: f32| x.recip();
}

pub(crate) fn sign_scalar(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}

pub(crate) fn log1mexp_scalar(x: f32) -> f32 {
    if x > -core::f32::consts::LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

pub(crate) fn root_scalar(x: f32, n: i32) -> f32 {
    sign_scalar(x) * x.abs().powf(1.0 / n as f32)
}

impl Tensor<TensorFloat> {
    /// Raises each element to a constant power.
    #[must_use]
    pub fn powf(&self, exponent: TensorFloat) -> Tensor<TensorFloat> {
        self.map(move |x| x.powf(exponent))
    }

    /// Raises each element to an integer power.
    #[must_use]
    pub fn powi(&self, exponent: i32) -> Tensor<TensorFloat> {
        self.map(move |x| x.powi(exponent))
    }

    /// Elementwise `self ^ exponent` with broadcasting.
    ///
    /// # Panics
    /// Panics if the shapes cannot be broadcast together.
    #[must_use]
    pub fn pow(&self, exponent: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        zip_map(self, exponent, TensorFloat::powf)
    }

    /// The real `n`-th root, `sign(x) * |x|^(1/n)`.
    #[must_use]
    pub fn root(&self, n: i32) -> Tensor<TensorFloat> {
        self.map(move |x| root_scalar(x, n))
    }

    /// Elementwise maximum with broadcasting.
    #[must_use]
    pub fn maximum(&self, other: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        zip_map(self, other, TensorFloat::max)
    }

    /// Elementwise minimum with broadcasting.
    #[must_use]
    pub fn minimum(&self, other: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        zip_map(self, other, TensorFloat::min)
    }

    /// Clamps every element into `[low, high]`.
    #[must_use]
    pub fn clamped(&self, low: TensorFloat, high: TensorFloat) -> Tensor<TensorFloat> {
        self.map(move |x| x.clamp(low, high))
    }

    /// Which elements are neither infinite nor NaN.
    pub fn is_finite(&self) -> Tensor<bool> {
        self.map(f32::is_finite)
    }

    /// Which elements are positive or negative infinity.
    pub fn is_infinite(&self) -> Tensor<bool> {
        self.map(f32::is_infinite)
    }

    /// Which elements are NaN.
    pub fn is_nan(&self) -> Tensor<bool> {
        self.map(f32::is_nan)
    }

    /// Elementwise `self > other` with broadcasting.
    pub fn greater(&self, other: &Tensor<TensorFloat>) -> Tensor<bool> {
        zip_map(self, other, |a, b| a > b)
    }

    /// Elementwise `self < other` with broadcasting.
    pub fn less(&self, other: &Tensor<TensorFloat>) -> Tensor<bool> {
        zip_map(self, other, |a, b| a < b)
    }

    /// Broadcasts the tensor to `shape`, materialising the repeated elements.
    ///
    /// # Errors
    /// Fails unless `self` broadcasts to exactly `shape`.
    pub fn try_broadcast_to(&self, shape: &[usize]) -> Result<Tensor<TensorFloat>, ShapeError> {
        if broadcast_shapes(self.shape(), shape)? != shape {
            return Err(ShapeError::Broadcast {
                lhs: self.shape().to_vec(),
                rhs: shape.to_vec(),
            });
        }
        let strides = broadcast_strides(self.shape(), shape);
        let src = self.data();
        let data = (0..element_count(shape))
            .into_par_iter()
            .map(|i| src[source_index(i, shape, &strides)])
            .collect();
        Tensor::try_new(shape.to_vec(), data)
    }

    /// Broadcasts the tensor to `shape`.
    ///
    /// # Panics
    /// Panics unless `self` broadcasts to exactly `shape`.
    #[must_use]
    pub fn broadcast_to(&self, shape: &[usize]) -> Tensor<TensorFloat> {
        self.try_broadcast_to(shape).unwrap_or_else(|err| panic!("{err}"))
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Tensor<TensorFloat>> for &Tensor<TensorFloat> {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
                zip_map(self, rhs, |a, b| a $op b)
            }
        }

        impl $trait<Tensor<TensorFloat>> for Tensor<TensorFloat> {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: Tensor<TensorFloat>) -> Tensor<TensorFloat> {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&Tensor<TensorFloat>> for Tensor<TensorFloat> {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
                (&self).$method(rhs)
            }
        }

        impl $trait<Tensor<TensorFloat>> for &Tensor<TensorFloat> {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: Tensor<TensorFloat>) -> Tensor<TensorFloat> {
                self.$method(&rhs)
            }
        }

        impl $trait<TensorFloat> for &Tensor<TensorFloat> {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: TensorFloat) -> Tensor<TensorFloat> {
                self.map(move |a| a $op rhs)
            }
        }

        impl $trait<TensorFloat> for Tensor<TensorFloat> {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: TensorFloat) -> Tensor<TensorFloat> {
                (&self).$method(rhs)
            }
        }

        impl $trait<&Tensor<TensorFloat>> for TensorFloat {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
                rhs.map(move |b| self $op b)
            }
        }

        impl $trait<Tensor<TensorFloat>> for TensorFloat {
            type Output = Tensor<TensorFloat>;

            fn $method(self, rhs: Tensor<TensorFloat>) -> Tensor<TensorFloat> {
                self.$method(&rhs)
            }
        }
    };
}

binary_operator!(Add, add, +);
binary_operator!(Sub, sub, -);
binary_operator!(Mul, mul, *);
binary_operator!(Div, div, /);

impl Neg for &Tensor<TensorFloat> {
    type Output = Tensor<TensorFloat>;

    fn neg(self) -> Tensor<TensorFloat> {
        self.map(|x| -x)
    }
}

impl Neg for Tensor<TensorFloat> {
    type Output = Tensor<TensorFloat>;

    fn neg(self) -> Tensor<TensorFloat> {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_operands_apply_to_every_element() {
        let x = Tensor::from_vec(vec![1.0_f32, 2.0]);
        assert_eq!((&x * 2.0).data(), &[2.0, 4.0]);
        assert_eq!((1.0 - &x).data(), &[0.0, -1.0]);
    }

    #[test]
    fn incompatible_shapes_are_reported() {
        let a = Tensor::<f32>::zeros(vec![2, 3]);
        let b = Tensor::<f32>::zeros(vec![2]);
        assert!(matches!(
            try_zip_map(&a, &b, |x, y| x + y),
            Err(ShapeError::Broadcast { .. })
        ));
    }

    #[test]
    fn broadcast_to_repeats_rows() {
        let row = Tensor::from_vec(vec![1.0_f32, 2.0]);
        let grid = row.broadcast_to(&[2, 2]);
        assert_eq!(grid.data(), &[1.0, 2.0, 1.0, 2.0]);
        assert!(row.try_broadcast_to(&[3]).is_err());
    }

    #[test]
    fn log1mexp_is_stable_on_both_branches() {
        assert!((log1mexp_scalar(-1e-3) - (1.0f64 - (-1e-3f64).exp()).ln() as f32).abs() < 1e-3);
        assert!((log1mexp_scalar(-20.0) - (-(-20.0f32).exp())).abs() < 1e-9);
    }
}
