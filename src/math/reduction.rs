//! Reductions over all elements or a set of axes.
//!
//! Every reduction comes in three forms:
//!
//! - `op()` reduces everything to a rank-0 tensor
//! - `op_squeezing(axes)` removes the reduced axes
//! - `op_along(axes)` keeps the reduced axes with size `1`, so the result
//!   broadcasts against the input
//!
//! ```rust
//! use seqgrad::{tensor, tensors::Tensor};
//!
//! let x: Tensor<f32> = tensor!([[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]]);
//! assert_eq!(x.sum_squeezing(&[0]).data(), &[2.0, 4.0, 6.0]);
//! assert_eq!(x.mean_along(&[1]).shape(), &[2, 1]);
//! ```
//!
//! Variance and standard deviation are population statistics.

use super::activation::finite_or_zero;
use crate::TensorFloat;
use crate::error::ShapeError;
use crate::shape::{
    broadcast_strides, element_count, keep_dims, normalize_axes, normalize_axis, source_index,
    split_at_axis, squeeze_dims, unbroadcast_axes,
};
use crate::tensors::Tensor;

/// The reductions available through [`Tensor::try_reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Product,
    Mean,
    Variance,
    StandardDeviation,
    Max,
    Min,
    LogSumExp,
}

impl Tensor<TensorFloat> {
    /// Reduces over `axes` (all axes when `None`).
    ///
    /// # Errors
    /// Returns [`ShapeError::InvalidAxis`] for axes outside the tensor's rank.
    pub fn try_reduce(
        &self,
        kind: Reduction,
        axes: Option<&[isize]>,
        keep: bool,
    ) -> Result<Tensor<TensorFloat>, ShapeError> {
        let axes = match axes {
            Some(axes) => normalize_axes(axes, self.rank())?,
            None => (0..self.rank()).collect(),
        };

        let kept = self.reduce_kept(kind, &axes);
        if keep {
            Ok(kept)
        } else {
            kept.try_reshaped(squeeze_dims(self.shape(), &axes))
        }
    }

    fn reduce_kept(&self, kind: Reduction, axes: &[usize]) -> Tensor<TensorFloat> {
        match kind {
            Reduction::Sum => self.fold_axes(axes, 0.0, |acc, x| acc + x),
            Reduction::Product => self.fold_axes(axes, 1.0, |acc, x| acc * x),
            Reduction::Max => self.fold_axes(axes, TensorFloat::NEG_INFINITY, TensorFloat::max),
            Reduction::Min => self.fold_axes(axes, TensorFloat::INFINITY, TensorFloat::min),
            Reduction::Mean => {
                let count = axes.iter().map(|&a| self.shape()[a]).product::<usize>();
                self.fold_axes(axes, 0.0, |acc, x| acc + x) / count as TensorFloat
            }
            Reduction::Variance => {
                let mean = self.reduce_kept(Reduction::Mean, axes);
                (self - &mean).squared().reduce_kept(Reduction::Mean, axes)
            }
            Reduction::StandardDeviation => self.reduce_kept(Reduction::Variance, axes).sqrt(),
            Reduction::LogSumExp => {
                let max = self.reduce_kept(Reduction::Max, axes).map(finite_or_zero);
                let total = (self - &max).exp().reduce_kept(Reduction::Sum, axes);
                total.log() + max
            }
        }
    }

    // Result keeps every axis; reduced ones have size 1.
    fn fold_axes<F>(&self, axes: &[usize], init: TensorFloat, fold: F) -> Tensor<TensorFloat>
    where
        F: Fn(TensorFloat, TensorFloat) -> TensorFloat,
    {
        let out_shape = keep_dims(self.shape(), axes);
        let out_strides = broadcast_strides(&out_shape, self.shape());
        let mut acc = vec![init; element_count(&out_shape)];

        for (i, &x) in self.data().iter().enumerate() {
            let j = source_index(i, self.shape(), &out_strides);
            acc[j] = fold(acc[j], x);
        }

        Tensor::new(out_shape, acc)
    }

    /// Sums a gradient of this tensor's shape back onto `target`, undoing a
    /// broadcast from `target` to `self.shape()`.
    ///
    /// # Panics
    /// Panics if `target` does not broadcast to this tensor's shape.
    #[must_use]
    pub fn reduce_to_shape(&self, target: &[usize]) -> Tensor<TensorFloat> {
        if self.shape() == target {
            return self.clone();
        }
        assert!(
            target.len() <= self.rank(),
            "cannot reduce shape {:?} to {:?}",
            self.shape(),
            target
        );
        let axes = unbroadcast_axes(self.shape(), target);
        self.fold_axes(&axes, 0.0, |acc, x| acc + x).reshaped(target.to_vec())
    }

    fn arg_search(
        &self,
        op: &'static str,
        axis: Option<isize>,
        better: fn(f32, f32) -> bool,
    ) -> Result<Tensor<i64>, ShapeError> {
        let empty = || ShapeError::Empty {
            op,
            shape: self.shape().to_vec(),
        };
        let Some(axis) = axis else {
            if self.is_empty() {
                return Err(empty());
            }
            let mut best = 0;
            for (i, &x) in self.data().iter().enumerate() {
                if better(x, self.data()[best]) {
                    best = i;
                }
            }
            return Ok(Tensor::scalar(best as i64));
        };

        let axis = normalize_axis(axis, self.rank())?;
        let (outer, len, inner) = split_at_axis(self.shape(), axis);
        let data = self.data();
        if len == 0 && outer * inner > 0 {
            return Err(empty());
        }
        let mut out = Vec::with_capacity(outer * inner);

        for o in 0..outer {
            for i in 0..inner {
                let at = |k: usize| data[(o * len + k) * inner + i];
                let mut best = 0;
                for k in 1..len {
                    if better(at(k), at(best)) {
                        best = k;
                    }
                }
                out.push(best as i64);
            }
        }

        Tensor::try_new(squeeze_dims(self.shape(), &[axis]), out)
    }

    /// Flat index of the largest element (first on ties), as a rank-0 tensor.
    ///
    /// # Errors
    /// Returns [`ShapeError::Empty`] for a tensor without elements.
    pub fn try_argmax(&self) -> Result<Tensor<i64>, ShapeError> {
        self.arg_search("argmax", None, |a, b| a > b)
    }

    /// Flat index of the largest element (first on ties), as a rank-0 tensor.
    ///
    /// # Panics
    /// Panics for a tensor without elements.
    pub fn argmax(&self) -> Tensor<i64> {
        self.try_argmax().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Flat index of the smallest element (first on ties), as a rank-0 tensor.
    ///
    /// # Errors
    /// Returns [`ShapeError::Empty`] for a tensor without elements.
    pub fn try_argmin(&self) -> Result<Tensor<i64>, ShapeError> {
        self.arg_search("argmin", None, |a, b| a < b)
    }

    /// Flat index of the smallest element (first on ties), as a rank-0 tensor.
    ///
    /// # Panics
    /// Panics for a tensor without elements.
    pub fn argmin(&self) -> Tensor<i64> {
        self.try_argmin().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Indices of the largest elements along `axis`, which is removed.
    ///
    /// # Errors
    /// Fails if `axis` is out of range or has length zero in a non-empty result.
    pub fn try_argmax_squeezing(&self, axis: isize) -> Result<Tensor<i64>, ShapeError> {
        self.arg_search("argmax", Some(axis), |a, b| a > b)
    }

    /// Indices of the largest elements along `axis`, which is removed.
    ///
    /// # Panics
    /// Panics if `axis` is out of range or has length zero.
    pub fn argmax_squeezing(&self, axis: isize) -> Tensor<i64> {
        self.try_argmax_squeezing(axis).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Indices of the smallest elements along `axis`, which is removed.
    ///
    /// # Panics
    /// Panics if `axis` is out of range or has length zero.
    pub fn argmin_squeezing(&self, axis: isize) -> Tensor<i64> {
        self.arg_search("argmin", Some(axis), |a, b| a < b)
            .unwrap_or_else(|err| panic!("{err}"))
    }
}

macro_rules! reductions {
    ($( $kind:ident => $all:ident, $squeezing:ident, $along:ident; )*) => {
        impl Tensor<TensorFloat> {
            $(
                #[doc = concat!("`", stringify!($kind), "` over every element, as a rank-0 tensor.")]
                #[must_use]
                pub fn $all(&self) -> Tensor<TensorFloat> {
                    self.reduce_or_panic(Reduction::$kind, None, false)
                }

                #[doc = concat!("`", stringify!($kind), "` over `axes`, removing them.")]
                ///
                /// # Panics
                /// Panics if an axis is out of range.
                #[must_use]
                pub fn $squeezing(&self, axes: &[isize]) -> Tensor<TensorFloat> {
                    self.reduce_or_panic(Reduction::$kind, Some(axes), false)
                }

                #[doc = concat!("`", stringify!($kind), "` over `axes`, keeping them with size 1.")]
                ///
                /// # Panics
                /// Panics if an axis is out of range.
                #[must_use]
                pub fn $along(&self, axes: &[isize]) -> Tensor<TensorFloat> {
                    self.reduce_or_panic(Reduction::$kind, Some(axes), true)
                }
            )*
        }
    };
}

impl Tensor<TensorFloat> {
    fn reduce_or_panic(&self, kind: Reduction, axes: Option<&[isize]>, keep: bool) -> Tensor<TensorFloat> {
        self.try_reduce(kind, axes, keep).unwrap_or_else(|err| panic!("{err}"))
    }
}

reductions! {
    Sum => sum, sum_squeezing, sum_along;
    Product => product, product_squeezing, product_along;
    Mean => mean, mean_squeezing, mean_along;
    Variance => variance, variance_squeezing, variance_along;
    StandardDeviation => standard_deviation, standard_deviation_squeezing, standard_deviation_along;
    Max => max, max_squeezing, max_along;
    Min => min, min_squeezing, min_along;
    LogSumExp => log_sum_exp, log_sum_exp_squeezing, log_sum_exp_along;
}
