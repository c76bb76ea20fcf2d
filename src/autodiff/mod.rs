//! Reverse-mode differentiation.
//!
//! A [`Tape`] records every operation performed on [`Var`]s together with a
//! pullback closure mapping the output cotangent to one cotangent per input.
//! [`Var::backward`] replays the tape in reverse, accumulating gradients.
//!
//! ```rust
//! use seqgrad::autodiff::gradient;
//! use seqgrad::tensor;
//!
//! // d/dx sum(x^2) = 2x
//! let g = gradient(&tensor!([1.0, -2.0, 3.0]), |x| x.squared().sum());
//! assert_eq!(g.data(), &[2.0, -4.0, 6.0]);
//! ```
//!
//! Tapes are single-threaded. A tape grows until it is dropped, so use a fresh
//! one per gradient computation.

mod ops;

use std::cell::RefCell;
use std::rc::Rc;

use crate::TensorFloat;
use crate::error::ShapeError;
use crate::tensors::Tensor;

/// Maps an output cotangent to the cotangent of each parent, in parent order.
pub type Pullback = Box<dyn Fn(&Tensor<TensorFloat>) -> Vec<Tensor<TensorFloat>>>;

struct Node {
    parents: Vec<usize>,
    pullback: Option<Pullback>,
    shape: Vec<usize>,
}

/// The recorded computation.
#[derive(Default)]
pub struct Tape {
    nodes: RefCell<Vec<Node>>,
}

impl Tape {
    /// Creates an empty shared tape.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Records a leaf variable.
    pub fn var(self: &Rc<Self>, value: Tensor<TensorFloat>) -> Var {
        self.push(value, Vec::new(), None)
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push(
        self: &Rc<Self>,
        value: Tensor<TensorFloat>,
        parents: Vec<usize>,
        pullback: Option<Pullback>,
    ) -> Var {
        let mut nodes = self.nodes.borrow_mut();
        let index = nodes.len();
        nodes.push(Node {
            parents,
            pullback,
            shape: value.shape().to_vec(),
        });
        Var {
            tape: Rc::clone(self),
            index,
            value: Rc::new(value),
        }
    }

    fn backward_from(&self, root: usize, seed: Tensor<TensorFloat>) -> Gradients {
        let nodes = self.nodes.borrow();
        let mut grads: Vec<Option<Tensor<TensorFloat>>> = Vec::new();
        grads.resize_with(root + 1, || None);
        grads[root] = Some(seed);

        for index in (0..=root).rev() {
            let Some(grad) = grads[index].take() else {
                continue;
            };
            let node = &nodes[index];
            if let Some(pullback) = &node.pullback {
                for (&parent, contribution) in node.parents.iter().zip(pullback(&grad)) {
                    debug_assert_eq!(contribution.shape(), nodes[parent].shape.as_slice());
                    grads[parent] = Some(match grads[parent].take() {
                        Some(acc) => acc + contribution,
                        None => contribution,
                    });
                }
            }
            grads[index] = Some(grad);
        }

        tracing::trace!(nodes = root + 1, "backward pass");
        Gradients { grads }
    }
}

/// A value recorded on a [`Tape`].
#[derive(Clone)]
pub struct Var {
    tape: Rc<Tape>,
    index: usize,
    value: Rc<Tensor<TensorFloat>>,
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Var")
            .field("index", &self.index)
            .field("value", &self.value)
            .finish()
    }
}

impl Var {
    /// The forward value.
    pub fn value(&self) -> &Tensor<TensorFloat> {
        &self.value
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// The tape this variable is recorded on.
    pub fn tape(&self) -> &Rc<Tape> {
        &self.tape
    }

    /// Records a constant on the same tape. Constants receive gradients but
    /// nothing reads them.
    pub fn lift(&self, value: Tensor<TensorFloat>) -> Var {
        self.tape.var(value)
    }

    /// Records the result of an operation whose parents are `parents`.
    pub(crate) fn record(&self, value: Tensor<TensorFloat>, parents: &[&Var], pullback: Pullback) -> Var {
        debug_assert!(parents.iter().all(|p| Rc::ptr_eq(&p.tape, &self.tape)));
        self.tape
            .push(value, parents.iter().map(|p| p.index).collect(), Some(pullback))
    }

    /// Backpropagates from a single-element value with seed `1`.
    ///
    /// # Errors
    /// Returns [`ShapeError::NotScalar`] when the value has more than one element.
    pub fn try_backward(&self) -> Result<Gradients, ShapeError> {
        if self.value.len() != 1 {
            return Err(ShapeError::NotScalar {
                shape: self.shape().to_vec(),
            });
        }
        Ok(self.tape.backward_from(self.index, Tensor::ones(self.shape().to_vec())))
    }

    /// Backpropagates from a single-element value with seed `1`.
    ///
    /// # Panics
    /// Panics when the value has more than one element.
    pub fn backward(&self) -> Gradients {
        self.try_backward().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Backpropagates an arbitrary cotangent of the value's shape.
    ///
    /// # Panics
    /// Panics when `seed` does not have the value's shape.
    pub fn backward_with(&self, seed: Tensor<TensorFloat>) -> Gradients {
        assert_eq!(
            seed.shape(),
            self.shape(),
            "seed shape must match the value shape"
        );
        self.tape.backward_from(self.index, seed)
    }
}

/// Accumulated gradients from one backward pass.
pub struct Gradients {
    grads: Vec<Option<Tensor<TensorFloat>>>,
}

impl Gradients {
    /// The gradient of the backward root with respect to `var`.
    ///
    /// Variables that did not contribute (or were recorded after the root) get
    /// zeros of their shape.
    pub fn wrt(&self, var: &Var) -> Tensor<TensorFloat> {
        self.grads
            .get(var.index)
            .and_then(Option::as_ref)
            .cloned()
            .unwrap_or_else(|| Tensor::zeros(var.shape().to_vec()))
    }
}

/// Gradient of a scalar function at `x`.
pub fn gradient<F>(x: &Tensor<TensorFloat>, f: F) -> Tensor<TensorFloat>
where
    F: FnOnce(&Var) -> Var,
{
    value_with_gradient(x, f).1
}

/// Gradients of a scalar function of two arguments.
pub fn gradient2<F>(
    x: &Tensor<TensorFloat>,
    y: &Tensor<TensorFloat>,
    f: F,
) -> (Tensor<TensorFloat>, Tensor<TensorFloat>)
where
    F: FnOnce(&Var, &Var) -> Var,
{
    value_with_gradient2(x, y, f).1
}

/// Value and gradient of a scalar function at `x`.
///
/// # Panics
/// Panics if `f` does not return a single-element value.
pub fn value_with_gradient<F>(x: &Tensor<TensorFloat>, f: F) -> (Tensor<TensorFloat>, Tensor<TensorFloat>)
where
    F: FnOnce(&Var) -> Var,
{
    let tape = Tape::new();
    let x = tape.var(x.clone());
    let out = f(&x);
    let grads = out.backward();
    (out.value().clone(), grads.wrt(&x))
}

/// Value and gradients of a scalar function of two arguments.
///
/// # Panics
/// Panics if `f` does not return a single-element value.
pub fn value_with_gradient2<F>(
    x: &Tensor<TensorFloat>,
    y: &Tensor<TensorFloat>,
    f: F,
) -> (Tensor<TensorFloat>, (Tensor<TensorFloat>, Tensor<TensorFloat>))
where
    F: FnOnce(&Var, &Var) -> Var,
{
    let tape = Tape::new();
    let x = tape.var(x.clone());
    let y = tape.var(y.clone());
    let out = f(&x, &y);
    let grads = out.backward();
    (out.value().clone(), (grads.wrt(&x), grads.wrt(&y)))
}
