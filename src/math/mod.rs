//! Numeric operations on [`crate::tensors::Tensor`].
//!
//! Elementwise operations broadcast with NumPy rules. Reductions and linear
//! algebra live in their own modules; everything is exposed as inherent methods.

pub mod activation;
pub mod elementwise;
pub mod linalg;
pub mod reduction;

pub use reduction::Reduction;
