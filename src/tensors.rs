//! Core tensor data structures and constructors.
//!
//! # Core Tensor Utilities
//!
//! A [`Tensor<T>`] is an N-dimensional array stored as a flat row-major `Vec<T>`
//! together with its shape. The shape of a rank-0 tensor is `[]` and it holds one
//! element.
//!
//! Storage is generic so that predicates can produce `Tensor<bool>` and index
//! searches `Tensor<i64>`. All arithmetic lives on [`Tensor<TensorFloat>`] and is
//! spread over the [`crate::math`] modules.
//!
//! ## Design Highlights
//! - The element count always matches the shape; constructors enforce it
//! - Tensors are values: operations return new tensors and never alias
//! - The `tensor!` macro builds tensors from nested literal arrays
//! - Random initialisers are seeded and deterministic
//!
//! ## Example
//!
//! ```rust
//! use seqgrad::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape(), &[2, 3]);
//! ```

use crate::TensorFloat;
use crate::error::ShapeError;
use crate::shape::element_count;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// Represents an N-dimensional tensor with a shape and flat row-major data.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        Self::try_new(shape, data).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Creates a new tensor, reporting a mismatched element count.
    ///
    /// # Errors
    /// Returns [`ShapeError::ElementCount`] when `data` does not fill `shape`.
    pub fn try_new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self, ShapeError> {
        let shape = shape.into();
        if element_count(&shape) != data.len() {
            return Err(ShapeError::ElementCount {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// A rank-0 tensor holding `value`.
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// A rank-1 tensor over `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// The dimensions of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// The number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements (some dimension is zero).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The flat row-major elements.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Same as [`Tensor::data`]; reads like the scalar accessor of the math API.
    #[inline]
    pub fn scalars(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the elements. The shape cannot change through it.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the tensor, returning its flat data.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Consumes the tensor, returning shape and data.
    pub fn into_parts(self) -> (Vec<usize>, Vec<T>) {
        (self.shape, self.data)
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.data.get(flat)
    }

    /// Returns the same elements under a new shape.
    ///
    /// # Errors
    /// Returns [`ShapeError::ElementCount`] when the element count would change.
    pub fn try_reshaped(&self, shape: impl Into<Vec<usize>>) -> Result<Self, ShapeError>
    where
        T: Clone,
    {
        Self::try_new(shape, self.data.clone())
    }

    /// Returns the same elements under a new shape.
    ///
    /// # Panics
    /// Panics when the element count would change.
    #[must_use]
    pub fn reshaped(&self, shape: impl Into<Vec<usize>>) -> Self
    where
        T: Clone,
    {
        self.try_reshaped(shape).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Replaces this tensor's data with another tensor of the same shape.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn update(&mut self, mut other: Tensor<T>) {
        assert_eq!(self.shape, other.shape, "shape mismatch");
        std::mem::swap(&mut self.data, &mut other.data);
    }

    /// The single element of a one-element tensor.
    ///
    /// # Errors
    /// Returns [`ShapeError::NotScalar`] for any other element count.
    pub fn try_scalarized(&self) -> Result<T, ShapeError>
    where
        T: Copy,
    {
        match self.data.as_slice() {
            [value] => Ok(*value),
            _ => Err(ShapeError::NotScalar {
                shape: self.shape.clone(),
            }),
        }
    }

    /// The single element of a one-element tensor.
    ///
    /// # Panics
    /// Panics if the tensor holds more or fewer than one element.
    pub fn scalarized(&self) -> T
    where
        T: Copy,
    {
        self.try_scalarized().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Applies `f` to every element in parallel.
    pub fn map<U, F>(&self, f: F) -> Tensor<U>
    where
        T: Copy + Sync,
        U: Send,
        F: Fn(T) -> U + Sync + Send,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.par_iter().map(|&x| f(x)).collect(),
        }
    }
}

impl<T: Clone> Tensor<T> {
    /// A tensor of `shape` with every element set to `value`.
    pub fn filled(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let len = element_count(&shape);
        Self {
            shape,
            data: vec![value; len],
        }
    }
}

impl Tensor<bool> {
    /// Whether every element is `true`. Empty tensors are `true`.
    pub fn all(&self) -> bool {
        self.data.iter().all(|&x| x)
    }

    /// Whether any element is `true`.
    pub fn any(&self) -> bool {
        self.data.iter().any(|&x| x)
    }
}

impl Tensor<TensorFloat> {
    /// A tensor of zeros.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::filled(shape, 0.0)
    }

    /// A tensor of ones.
    pub fn ones(shape: impl Into<Vec<usize>>) -> Self {
        Self::filled(shape, 1.0)
    }

    /// A zero tensor shaped like `self`.
    #[must_use]
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }

    /// A rank-1 tensor counting from `from` (inclusive) to `to` (exclusive) by `stride`.
    ///
    /// # Panics
    /// Panics if `stride` is zero or if any argument is not finite.
    pub fn range(from: TensorFloat, to: TensorFloat, stride: TensorFloat) -> Self {
        assert!(
            from.is_finite() && to.is_finite(),
            "range bounds must be finite, got {from}..{to}"
        );
        assert!(
            stride != 0.0 && stride.is_finite(),
            "range stride must be finite and non-zero"
        );
        let count = ((to - from) / stride).ceil().max(0.0) as usize;
        let data = (0..count).map(|i| from + stride * i as TensorFloat).collect();
        Self::from_vec(data)
    }

    /// Standard-normal samples, deterministic for a given `seed`.
    pub fn random_normal(shape: impl Into<Vec<usize>>, seed: u64) -> Self {
        let shape = shape.into();
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..element_count(&shape))
            .map(|_| rng.sample::<TensorFloat, _>(StandardNormal))
            .collect();
        Self { shape, data }
    }

    /// Uniform samples from `[low, high)`, deterministic for a given `seed`.
    pub fn random_uniform(
        shape: impl Into<Vec<usize>>,
        low: TensorFloat,
        high: TensorFloat,
        seed: u64,
    ) -> Self {
        let shape = shape.into();
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..element_count(&shape))
            .map(|_| low + (high - low) * rng.random::<TensorFloat>())
            .collect();
        Self { shape, data }
    }

    /// Glorot (Xavier) uniform initialisation for a weight of `shape`.
    ///
    /// Fan-in and fan-out are the last two dimensions; leading dimensions act as
    /// receptive field multipliers.
    pub fn glorot_uniform(shape: impl Into<Vec<usize>>, seed: u64) -> Self {
        let shape = shape.into();
        let (fan_in, fan_out) = match shape.as_slice() {
            [] => (1, 1),
            [n] => (*n, *n),
            [.., i, o] => {
                let field = element_count(&shape[..shape.len() - 2]);
                (i * field, o * field)
            }
        };
        let limit = (6.0 / (fan_in + fan_out).max(1) as TensorFloat).sqrt();
        Self::random_uniform(shape, -limit, limit, seed)
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
///
/// # Example
/// ```
/// use seqgrad::{tensor, tensors::Tensor};
/// let t: Tensor<f32> = tensor!([[1.0, 2.0], [3.0, -4.0]]);
/// assert_eq!(t.shape(), &[2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([ $( [ $($inner:tt)* ] ),+ $(,)? ]) => {{
        let children = vec![ $( $crate::tensor!([ $($inner)* ]) ),+ ];
        let first_shape = children[0].shape().to_vec();
        assert!(children.iter().all(|c| c.shape() == first_shape.as_slice()),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(&first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].len());
        for c in children { data.extend(c.into_data()); }
        $crate::tensors::Tensor::new(shape, data)
    }};

    ([ $( $value:expr ),+ $(,)? ]) => {
        $crate::tensors::Tensor::from_vec(vec![ $( $value ),+ ])
    };

    ($value:expr) => {
        $crate::tensors::Tensor::scalar($value)
    };
}
