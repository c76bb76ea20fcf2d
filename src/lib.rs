//! seqgrad: sequential layer composition over a small differentiable tensor runtime.
//!
//! # Features
//!
//! - N-dimensional `f32` tensors with NumPy broadcasting, elementary math,
//!   reductions, activations and batched linear algebra
//! - Reverse-mode differentiation through a gradient tape
//! - Layers that compose statically ([`layers::Sequential`], [`sequential!`])
//!   or dynamically with shape checks ([`layers::Pipeline`])
//! - Losses, SGD/Adam, and `.bpat` parameter checkpoints
//!
//! # Modules
//!
//! - [`tensors`]: the [`tensors::Tensor`] type and constructors
//! - [`math`]: eager numeric operations
//! - [`autodiff`]: [`autodiff::Tape`], [`autodiff::Var`] and gradient entry points
//! - [`layers`]: the [`layers::Layer`] trait and its implementations
//! - [`loss`], [`optim`], [`train`]: training utilities
//! - [`modelio`]: checkpoint files
//! - [`backend`], [`ops`]: kernel dispatch (CPU, or `wgpu` behind a feature)
//!
//! # Example
//!
//! ```rust
//! use seqgrad::layers::{ActivationKind, Dense, Layer};
//! use seqgrad::optim::Sgd;
//! use seqgrad::{loss, sequential, tensor, train::train_step};
//!
//! let mut model = sequential![
//!     Dense::new(2, 8, ActivationKind::Tanh, 1),
//!     Dense::new(8, 1, ActivationKind::Identity, 2),
//! ];
//! let x = tensor!([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
//! let y = tensor!([[0.0], [1.0], [1.0], [0.0]]);
//!
//! let mut sgd = Sgd::new(0.1);
//! let first = train_step(&mut model, &mut sgd, &x, &y, loss::mean_squared_error);
//! for _ in 0..50 {
//!     train_step(&mut model, &mut sgd, &x, &y, loss::mean_squared_error);
//! }
//! let last = train_step(&mut model, &mut sgd, &x, &y, loss::mean_squared_error);
//! assert!(last < first);
//! ```

pub mod approx;
pub mod autodiff;
pub mod backend;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod modelio;
pub mod ops;
pub mod optim;
pub mod shape;
pub mod tensors;
pub mod train;

/// Element type of every floating point tensor.
pub type TensorFloat = f32;

pub use autodiff::{Tape, Var, gradient, gradient2, value_with_gradient, value_with_gradient2};
pub use error::{CheckpointError, LayerError, ShapeError};
pub use layers::{Layer, Pipeline, Sequential};
pub use tensors::Tensor;
