//! Error types.
//!
//! Shape violations are reported through [`ShapeError`]. The `try_*` entry points
//! return it directly; their infallible twins (and the arithmetic operators) panic
//! with its message instead.
//!
//! [`LayerError`] is raised while composing layers, when a layer cannot accept the
//! shape produced by its predecessor. [`CheckpointError`] covers reading and
//! writing parameter files.

use thiserror::Error;

/// A tensor shape did not satisfy the requirements of an operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The number of elements does not match the product of the shape.
    #[error("shape {shape:?} is incompatible with {len} data elements")]
    ElementCount { shape: Vec<usize>, len: usize },

    /// Two shapes cannot be broadcast against each other.
    #[error("shapes {lhs:?} and {rhs:?} cannot be broadcast together")]
    Broadcast { lhs: Vec<usize>, rhs: Vec<usize> },

    /// The inner dimensions of a matrix product disagree.
    #[error("matmul inner dimensions differ: {lhs:?} x {rhs:?}")]
    MatmulInner { lhs: Vec<usize>, rhs: Vec<usize> },

    /// An axis is out of range for the tensor's rank.
    #[error("axis {axis} is out of range for rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    /// The operation needs a different rank.
    #[error("{op} requires {expected}, got shape {shape:?}")]
    Rank {
        op: &'static str,
        expected: &'static str,
        shape: Vec<usize>,
    },

    /// A single element was required.
    #[error("expected a single-element tensor, got shape {shape:?}")]
    NotScalar { shape: Vec<usize> },

    /// The operation has no elements to choose from.
    #[error("{op} of an empty reduction, got shape {shape:?}")]
    Empty { op: &'static str, shape: Vec<usize> },

    /// Two shapes were required to be identical.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    Mismatch { expected: Vec<usize>, got: Vec<usize> },
}

/// A layer rejected the shape it would receive inside a composition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayerError {
    /// The layer cannot consume the given input shape.
    #[error("{layer} cannot accept input of shape {input:?}: {reason}")]
    IncompatibleInput {
        layer: &'static str,
        input: Vec<usize>,
        reason: String,
    },

    /// A parameter tensor has the wrong shape.
    #[error("{layer} parameter `{parameter}` has shape {got:?}, expected {expected:?}")]
    ParameterShape {
        layer: &'static str,
        parameter: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Failure to save or restore a parameter checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the checkpoint magic.
    #[error("invalid magic header")]
    BadMagic,

    /// The file was written by an unknown format revision.
    #[error("unsupported checkpoint version {0}")]
    UnsupportedVersion(u8),

    /// A stored tensor failed validation.
    #[error("tensor {index} is corrupted")]
    Corrupted { index: usize },

    /// The checkpoint holds a different number of tensors than the target.
    #[error("checkpoint holds {found} tensors, layer expects {expected}")]
    CountMismatch { expected: usize, found: usize },

    /// A stored tensor has a different shape than the target parameter.
    #[error("tensor {index} has shape {found:?}, layer expects {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}
