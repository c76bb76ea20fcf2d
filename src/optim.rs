//! Parameter update rules.
//!
//! Optimisers keep per-parameter state (momentum buffers, moment estimates)
//! indexed by parameter position, so the same optimiser must always be used
//! with the same model.

use crate::TensorFloat;
use crate::ops::dispatch;
use crate::tensors::Tensor;

/// Applies one update step given gradients in parameter order.
pub trait Optimizer {
    /// # Panics
    /// Panics when the number or shapes of `grads` do not match `params`.
    fn update(&mut self, params: Vec<&mut Tensor<TensorFloat>>, grads: &[Tensor<TensorFloat>]);
}

fn check_pairs(params: &[&mut Tensor<TensorFloat>], grads: &[Tensor<TensorFloat>]) {
    assert_eq!(params.len(), grads.len(), "expected one gradient per parameter");
    for (i, (p, g)) in params.iter().zip(grads).enumerate() {
        assert_eq!(p.shape(), g.shape(), "gradient {i} does not match its parameter");
    }
}

// Lazily sized state buffers, one per parameter.
fn state_for(state: &mut Vec<Tensor<TensorFloat>>, params: &[&mut Tensor<TensorFloat>]) {
    if state.len() != params.len() || state.iter().zip(params).any(|(s, p)| s.shape() != p.shape()) {
        *state = params.iter().map(|p| p.zeros_like()).collect();
    }
}

/// Stochastic gradient descent with optional momentum.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: TensorFloat,
    pub momentum: TensorFloat,
    velocity: Vec<Tensor<TensorFloat>>,
}

impl Sgd {
    pub fn new(learning_rate: TensorFloat) -> Self {
        Self::with_momentum(learning_rate, 0.0)
    }

    pub fn with_momentum(learning_rate: TensorFloat, momentum: TensorFloat) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, mut params: Vec<&mut Tensor<TensorFloat>>, grads: &[Tensor<TensorFloat>]) {
        check_pairs(&params, grads);
        if self.momentum == 0.0 {
            for (p, g) in params.iter_mut().zip(grads) {
                dispatch::sgd(p.data_mut(), g.data(), self.learning_rate);
            }
            return;
        }

        state_for(&mut self.velocity, &params);
        for ((p, v), g) in params.iter_mut().zip(&mut self.velocity).zip(grads) {
            dispatch::sgd_momentum(p.data_mut(), v.data_mut(), g.data(), self.learning_rate, self.momentum);
        }
    }
}

/// Adam with `beta1 = 0.9`, `beta2 = 0.999`, `eps = 1e-8`.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: TensorFloat,
    step: i32,
    first_moment: Vec<Tensor<TensorFloat>>,
    second_moment: Vec<Tensor<TensorFloat>>,
}

impl Adam {
    pub fn new(learning_rate: TensorFloat) -> Self {
        Self {
            learning_rate,
            step: 0,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
        }
    }

    /// Number of updates applied so far.
    pub fn step(&self) -> i32 {
        self.step
    }
}

impl Optimizer for Adam {
    fn update(&mut self, mut params: Vec<&mut Tensor<TensorFloat>>, grads: &[Tensor<TensorFloat>]) {
        check_pairs(&params, grads);
        state_for(&mut self.first_moment, &params);
        state_for(&mut self.second_moment, &params);
        self.step = self.step.saturating_add(1);

        for (i, (p, g)) in params.iter_mut().zip(grads).enumerate() {
            dispatch::adam(
                p.data_mut(),
                self.first_moment[i].data_mut(),
                self.second_moment[i].data_mut(),
                g.data(),
                self.step,
                self.learning_rate,
            );
        }
    }
}
